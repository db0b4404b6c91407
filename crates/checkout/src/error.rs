//! Error type for checkout operations.
//!
//! All variants are local, recoverable conditions carrying a message safe
//! to show to the end user; the calling layer decides how each kind maps
//! onto its own surface (the server maps them to HTTP statuses).

use clementine_core::ProductId;
use thiserror::Error;

use crate::store::StoreError;

/// Errors surfaced by cart, coupon, and order operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A referenced product, coupon, cart, item, or order does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation is not allowed in the current state
    /// (empty cart, invalid coupon, illegal status transition).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Requested quantity exceeds the product's available stock.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The requester may not act on this resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A collaborator (catalog, coupon, cart, or order store) failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for `CheckoutError`.
pub type Result<T> = std::result::Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CheckoutError::NotFound("product 7 not found".to_owned());
        assert_eq!(err.to_string(), "not found: product 7 not found");

        let err = CheckoutError::InsufficientStock {
            product_id: ProductId::new(7),
            requested: 5,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 7: requested 5, available 2"
        );
    }
}
