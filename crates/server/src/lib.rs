//! Clementine Server - checkout JSON API.
//!
//! Serves the cart/coupon/order pipeline over HTTP:
//!
//! - Axum routers per resource under `/api`
//! - `PostgreSQL` persistence through [`db::PgStore`], which implements the
//!   checkout crate's store traits
//! - Identity supplied by the upstream gateway via `x-user-id` /
//!   `x-user-role` headers (this binary performs no authentication itself)
//!
//! The domain logic lives in `clementine-checkout`; this crate only
//! marshals requests, maps errors onto HTTP statuses, and owns process
//! concerns (config, pool, logging, shutdown).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
