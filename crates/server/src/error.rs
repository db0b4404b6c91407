//! Unified error handling for route handlers.
//!
//! Provides an `AppError` type that maps checkout-domain errors onto HTTP
//! statuses. All route handlers return `Result<T, AppError>`. Responses
//! carry a JSON body of the form `{"error": "..."}`; store and internal
//! failures are logged and replaced with a generic message so no internal
//! detail leaks to clients.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use clementine_checkout::CheckoutError;
use serde_json::json;
use thiserror::Error;

/// Application-level error type for the server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A checkout-domain operation failed.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Bad request from client (malformed path or body values).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Checkout(CheckoutError::Store(_)) | Self::Internal(_)) {
            tracing::error!(error = %self, "request error");
        }

        let status = match &self {
            Self::Checkout(err) => match err {
                CheckoutError::NotFound(_) => StatusCode::NOT_FOUND,
                CheckoutError::InvalidState(_) | CheckoutError::InsufficientStock { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CheckoutError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                CheckoutError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Checkout(CheckoutError::Store(_)) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Checkout(err) => err.to_string(),
            Self::BadRequest(msg) => msg.clone(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use clementine_core::ProductId;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            get_status(CheckoutError::NotFound("order 1 not found".into()).into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CheckoutError::InvalidState("cart is empty".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(
                CheckoutError::InsufficientStock {
                    product_id: ProductId::new(1),
                    requested: 3,
                    available: 1,
                }
                .into()
            ),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CheckoutError::Unauthorized("nope".into()).into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
