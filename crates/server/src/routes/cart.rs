//! Cart route handlers.
//!
//! All cart endpoints act on the authenticated user's own cart; the cart
//! is created lazily by the first add.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use clementine_checkout::cart::Cart;
use clementine_core::{CartItemId, ProductId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Build the cart router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cart", get(show))
        .route("/api/cart/items", post(add_item))
        .route("/api/cart/items/{id}", put(update_item).delete(remove_item))
}

/// Cart line item as returned to clients.
#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Applied coupon as returned to clients.
#[derive(Debug, Serialize)]
pub struct AppliedCouponView {
    pub code: String,
    pub discount_amount: Decimal,
}

/// Cart as returned to clients.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total_amount: Decimal,
    pub coupon: Option<AppliedCouponView>,
    pub discounted_amount: Option<Decimal>,
    pub item_count: u32,
}

impl CartView {
    /// An empty cart, for users who have not added anything yet.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_amount: Decimal::ZERO,
            coupon: None,
            discounted_amount: None,
            item_count: 0,
        }
    }
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        let item_count = cart.items.iter().map(|item| item.quantity).sum();
        Self {
            items: cart
                .items
                .iter()
                .map(|item| CartItemView {
                    id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    line_total: item.line_total(),
                })
                .collect(),
            total_amount: cart.total_amount,
            coupon: cart.coupon.map(|coupon| AppliedCouponView {
                code: coupon.code,
                discount_amount: coupon.discount_amount,
            }),
            discounted_amount: cart.discounted_amount,
            item_count,
        }
    }
}

/// Add-to-cart request body.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Update-item request body.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: u32,
}

/// Get the current user's cart.
#[instrument(skip(state, requester), fields(user_id = %requester.user_id))]
async fn show(
    RequireUser(requester): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<CartView>> {
    let cart = state.carts().cart(requester.user_id).await?;
    Ok(Json(cart.map_or_else(CartView::empty, Into::into)))
}

/// Add an item to the cart.
#[instrument(skip(state, requester), fields(user_id = %requester.user_id))]
async fn add_item(
    RequireUser(requester): RequireUser,
    State(state): State<AppState>,
    Json(body): Json<AddItemRequest>,
) -> Result<Json<CartView>> {
    let cart = state
        .carts()
        .add_item(requester.user_id, body.product_id, body.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// Update a cart item's quantity; zero removes the item.
#[instrument(skip(state, requester), fields(user_id = %requester.user_id))]
async fn update_item(
    RequireUser(requester): RequireUser,
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    Json(body): Json<UpdateItemRequest>,
) -> Result<Json<CartView>> {
    let cart = state
        .carts()
        .update_item(requester.user_id, CartItemId::from_uuid(item_id), body.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// Remove an item from the cart.
#[instrument(skip(state, requester), fields(user_id = %requester.user_id))]
async fn remove_item(
    RequireUser(requester): RequireUser,
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
) -> Result<Json<CartView>> {
    let cart = state
        .carts()
        .remove_item(requester.user_id, CartItemId::from_uuid(item_id))
        .await?;
    Ok(Json(cart.into()))
}
