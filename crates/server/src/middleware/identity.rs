//! Identity extractors for route handlers.
//!
//! Authentication happens upstream (the gateway terminates sessions and
//! tokens); by the time a request reaches this binary the caller's identity
//! is asserted in two trusted headers:
//!
//! - `x-user-id` - the authenticated user's numeric ID (required)
//! - `x-user-role` - `customer` or `admin` (defaults to `customer`)
//!
//! The extractors here only marshal those headers into a
//! [`Requester`]; they never validate credentials.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use clementine_checkout::service::Requester;
use clementine_core::{UserId, UserRole};

const USER_ID_HEADER: &str = "x-user-id";
const USER_ROLE_HEADER: &str = "x-user-role";

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireUser(requester): RequireUser) -> impl IntoResponse {
///     format!("hello, user {}", requester.user_id)
/// }
/// ```
pub struct RequireUser(pub Requester);

/// Extractor that requires an authenticated admin.
pub struct RequireAdmin(pub Requester);

/// Rejection for identity extraction failures.
#[derive(Debug)]
pub enum IdentityRejection {
    /// The identity headers are missing or malformed.
    Unauthenticated,
    /// The role header holds an unknown role.
    InvalidRole,
    /// The caller is authenticated but not an admin.
    NotAdmin,
}

impl IntoResponse for IdentityRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "authentication required").into_response()
            }
            Self::InvalidRole => (StatusCode::BAD_REQUEST, "invalid user role").into_response(),
            Self::NotAdmin => (StatusCode::UNAUTHORIZED, "admin access required").into_response(),
        }
    }
}

fn requester_from_parts(parts: &Parts) -> Result<Requester, IdentityRejection> {
    let user_id = parts
        .headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<i32>().ok())
        .ok_or(IdentityRejection::Unauthenticated)?;

    let role = match parts.headers.get(USER_ROLE_HEADER) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|value| value.parse::<UserRole>().ok())
            .ok_or(IdentityRejection::InvalidRole)?,
        None => UserRole::Customer,
    };

    Ok(Requester {
        user_id: UserId::new(user_id),
        role,
    })
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        requester_from_parts(parts).map(Self)
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = IdentityRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let requester = requester_from_parts(parts)?;
        if !requester.is_admin() {
            return Err(IdentityRejection::NotAdmin);
        }
        Ok(Self(requester))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/cart");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let (parts, ()) = builder.body(()).expect("valid request").into_parts();
        parts
    }

    #[test]
    fn test_requester_from_headers() {
        let parts = parts(&[("x-user-id", "7"), ("x-user-role", "admin")]);
        let requester = requester_from_parts(&parts).expect("valid identity");
        assert_eq!(requester.user_id, UserId::new(7));
        assert!(requester.is_admin());
    }

    #[test]
    fn test_role_defaults_to_customer() {
        let parts = parts(&[("x-user-id", "7")]);
        let requester = requester_from_parts(&parts).expect("valid identity");
        assert_eq!(requester.role, UserRole::Customer);
    }

    #[test]
    fn test_missing_user_id_is_rejected() {
        let parts = parts(&[("x-user-role", "admin")]);
        assert!(matches!(
            requester_from_parts(&parts),
            Err(IdentityRejection::Unauthenticated)
        ));
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let parts = parts(&[("x-user-id", "7"), ("x-user-role", "owner")]);
        assert!(matches!(
            requester_from_parts(&parts),
            Err(IdentityRejection::InvalidRole)
        ));
    }
}
