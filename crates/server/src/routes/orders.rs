//! Order route handlers.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use clementine_checkout::order::Order;
use clementine_checkout::service::{CreateOrderInput, StatusUpdate};
use clementine_core::OrderId;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireUser};
use crate::state::AppState;

/// Build the order router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(list).post(create))
        .route("/api/orders/{id}", get(show))
        .route("/api/orders/{id}/status", put(update_status))
        .route("/api/orders/{id}/cancel", post(cancel))
}

/// List orders: all of them for admins, the caller's own otherwise.
#[instrument(skip(state, requester), fields(user_id = %requester.user_id))]
async fn list(
    RequireUser(requester): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Order>>> {
    let orders = state.orders().orders(requester).await?;
    Ok(Json(orders))
}

/// Create an order from the caller's cart.
#[instrument(skip(state, requester, body), fields(user_id = %requester.user_id))]
async fn create(
    RequireUser(requester): RequireUser,
    State(state): State<AppState>,
    Json(body): Json<CreateOrderInput>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.orders().create_order(requester.user_id, body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Fetch a single order (owner or admin).
#[instrument(skip(state, requester), fields(user_id = %requester.user_id))]
async fn show(
    RequireUser(requester): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Order>> {
    let order = state.orders().order(requester, OrderId::new(id)).await?;
    Ok(Json(order))
}

/// Update an order's status fields (admin).
#[instrument(skip(state, admin, body))]
async fn update_status(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let order = state
        .orders()
        .update_status(admin, OrderId::new(id), body)
        .await?;
    Ok(Json(order))
}

/// Cancel a still-pending order (owner or admin).
#[instrument(skip(state, requester), fields(user_id = %requester.user_id))]
async fn cancel(
    RequireUser(requester): RequireUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Order>> {
    let order = state.orders().cancel(requester, OrderId::new(id)).await?;
    Ok(Json(order))
}
