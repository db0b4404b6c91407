//! Coupon route handlers.
//!
//! Shoppers apply and remove coupons on their own cart; coupon CRUD is
//! admin-only. Admin handlers talk to the coupon store directly - there is
//! no pricing logic in them, only persistence round-trips.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use clementine_checkout::CheckoutError;
use clementine_checkout::coupon::{Coupon, CouponUpdate, NewCoupon};
use clementine_checkout::store::CouponStore;
use clementine_core::CouponId;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::{RequireAdmin, RequireUser};
use crate::routes::cart::CartView;
use crate::state::AppState;

/// Build the coupon router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/coupons/apply", post(apply))
        .route("/api/coupons/remove", delete(remove))
        .route("/api/coupons", get(list).post(create))
        .route(
            "/api/coupons/{id}",
            get(show).put(update).delete(destroy),
        )
}

/// Apply-coupon request body.
#[derive(Debug, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
}

/// Apply a coupon code to the current user's cart.
#[instrument(skip(state, requester, body), fields(user_id = %requester.user_id))]
async fn apply(
    RequireUser(requester): RequireUser,
    State(state): State<AppState>,
    Json(body): Json<ApplyCouponRequest>,
) -> Result<Json<CartView>> {
    let cart = state
        .carts()
        .apply_coupon(requester.user_id, &body.code)
        .await?;
    Ok(Json(cart.into()))
}

/// Remove any applied coupon from the current user's cart.
#[instrument(skip(state, requester), fields(user_id = %requester.user_id))]
async fn remove(
    RequireUser(requester): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<CartView>> {
    let cart = state.carts().remove_coupon(requester.user_id).await?;
    Ok(Json(cart.into()))
}

/// List all coupons (admin).
#[instrument(skip(state, _admin))]
async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> Result<Json<Vec<Coupon>>> {
    let coupons = state
        .store()
        .list_coupons()
        .await
        .map_err(CheckoutError::from)?;
    Ok(Json(coupons))
}

/// Fetch a single coupon (admin).
#[instrument(skip(state, _admin))]
async fn show(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Coupon>> {
    let coupon = state
        .store()
        .coupon(CouponId::new(id))
        .await
        .map_err(CheckoutError::from)?
        .ok_or_else(|| CheckoutError::NotFound(format!("coupon {id} not found")))?;
    Ok(Json(coupon))
}

/// Create a coupon (admin).
#[instrument(skip(state, _admin, body))]
async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(body): Json<NewCoupon>,
) -> Result<(StatusCode, Json<Coupon>)> {
    let coupon = body.into_canonical()?;

    if state
        .store()
        .coupon_by_code(&coupon.code)
        .await
        .map_err(CheckoutError::from)?
        .is_some()
    {
        return Err(AppError::BadRequest(format!(
            "coupon code {} already exists",
            coupon.code
        )));
    }

    let stored = state
        .store()
        .insert_coupon(&coupon)
        .await
        .map_err(CheckoutError::from)?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Update a coupon (admin).
#[instrument(skip(state, _admin, body))]
async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<CouponUpdate>,
) -> Result<Json<Coupon>> {
    let mut coupon = state
        .store()
        .coupon(CouponId::new(id))
        .await
        .map_err(CheckoutError::from)?
        .ok_or_else(|| CheckoutError::NotFound(format!("coupon {id} not found")))?;

    coupon.apply_update(body)?;

    if !state
        .store()
        .update_coupon(&coupon)
        .await
        .map_err(CheckoutError::from)?
    {
        return Err(CheckoutError::NotFound(format!("coupon {id} not found")).into());
    }

    Ok(Json(coupon))
}

/// Delete a coupon (admin).
#[instrument(skip(state, _admin))]
async fn destroy(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let deleted = state
        .store()
        .delete_coupon(CouponId::new(id))
        .await
        .map_err(CheckoutError::from)?;

    if !deleted {
        return Err(CheckoutError::NotFound(format!("coupon {id} not found")).into());
    }

    Ok(StatusCode::NO_CONTENT)
}
