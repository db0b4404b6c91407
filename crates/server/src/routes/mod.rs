//! Route handlers for the checkout API.

use axum::Router;

use crate::state::AppState;

pub mod cart;
pub mod coupons;
pub mod orders;
pub mod payments;

/// Build the full API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(cart::router())
        .merge(coupons::router())
        .merge(orders::router())
        .merge(payments::router())
}
