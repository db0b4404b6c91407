//! Database access for the checkout schema.
//!
//! [`PgStore`] implements the checkout crate's store traits over a
//! `PostgreSQL` pool. Each trait lives in its own module; all of them share
//! the row-struct + `From` conversion pattern.
//!
//! Queries are runtime-bound (`sqlx::query_as` / `sqlx::query`): no offline
//! query cache is shipped, so the build never needs a database.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p clementine-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub mod carts;
pub mod catalog;
pub mod coupons;
pub mod orders;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Postgres-backed implementation of the catalog, coupon, cart, and order
/// stores.
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub(crate) const fn pool(&self) -> &PgPool {
        &self.pool
    }
}
