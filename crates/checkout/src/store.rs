//! Collaborator traits for the checkout pipeline.
//!
//! The catalog, coupon store, and cart/order persistence are external
//! collaborators: the domain only depends on these traits, and a store
//! handle is injected into each service at construction. The server crate
//! implements them over Postgres; [`memory::MemoryStore`] implements them
//! in memory for tests and local development.
//!
//! Methods return `impl Future + Send` so services stay usable from
//! multi-threaded runtimes without boxing.

use std::future::Future;

use clementine_core::{CouponId, OrderId, ProductId, UserId};
use thiserror::Error;

use crate::cart::Cart;
use crate::catalog::Product;
use crate::coupon::{Coupon, NewCoupon};
use crate::order::{NewOrder, Order};

pub mod memory;

/// Error from a store backend.
///
/// Store implementations wrap their native errors (`sqlx::Error`, ...) in
/// [`StoreError::Backend`]; the domain never inspects the payload beyond
/// logging it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl StoreError {
    /// Wrap a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Box::new(err))
    }
}

/// Read and stock-adjustment access to the product catalog.
pub trait CatalogStore {
    /// Fetch a product by ID.
    fn product(
        &self,
        id: ProductId,
    ) -> impl Future<Output = Result<Option<Product>, StoreError>> + Send;

    /// Atomically decrement a product's stock by `quantity`, guarded so
    /// stock never goes negative.
    ///
    /// Returns `true` when the decrement was applied, `false` when the
    /// product is missing or its stock is below `quantity`. The check and
    /// the write are one unit in the store - callers may rely on this as
    /// the compare-and-swap for stock reservation.
    fn decrement_stock(
        &self,
        id: ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Return `quantity` units of a product to stock.
    ///
    /// A missing product is ignored (it may have been deleted since the
    /// order was placed).
    fn increment_stock(
        &self,
        id: ProductId,
        quantity: u32,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Access to coupon records.
pub trait CouponStore {
    /// Look up a coupon by code, case-insensitively.
    fn coupon_by_code(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<Option<Coupon>, StoreError>> + Send;

    /// Fetch a coupon by ID.
    fn coupon(
        &self,
        id: CouponId,
    ) -> impl Future<Output = Result<Option<Coupon>, StoreError>> + Send;

    /// All coupons, newest first.
    fn list_coupons(&self) -> impl Future<Output = Result<Vec<Coupon>, StoreError>> + Send;

    /// Persist a new coupon. Fails with a backend error when the code is
    /// already taken.
    fn insert_coupon(
        &self,
        coupon: &NewCoupon,
    ) -> impl Future<Output = Result<Coupon, StoreError>> + Send;

    /// Overwrite an existing coupon's fields. Returns `false` when the
    /// coupon no longer exists.
    fn update_coupon(
        &self,
        coupon: &Coupon,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Delete a coupon. Returns `false` when it did not exist.
    fn delete_coupon(
        &self,
        id: CouponId,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Record one redemption of a coupon.
    fn increment_usage(
        &self,
        id: CouponId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Persistence for carts, keyed by owner.
pub trait CartStore {
    /// The user's cart, if one has been created.
    fn cart_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<Cart>, StoreError>> + Send;

    /// Create an empty cart for a user. Each user has at most one cart.
    fn create_cart(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Cart, StoreError>> + Send;

    /// Persist a cart's items, coupon state, and derived totals as-is.
    fn save_cart(&self, cart: &Cart) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Persistence for orders.
pub trait OrderStore {
    /// Persist a new order with both statuses `pending`, returning the
    /// stored record.
    fn insert_order(
        &self,
        order: &NewOrder,
    ) -> impl Future<Output = Result<Order, StoreError>> + Send;

    /// Fetch an order by ID.
    fn order(
        &self,
        id: OrderId,
    ) -> impl Future<Output = Result<Option<Order>, StoreError>> + Send;

    /// A user's orders, newest first.
    fn orders_for_user(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<Order>, StoreError>> + Send;

    /// All orders, newest first.
    fn all_orders(&self) -> impl Future<Output = Result<Vec<Order>, StoreError>> + Send;

    /// Persist an order's status fields and `updated_at`.
    fn update_order(&self, order: &Order)
    -> impl Future<Output = Result<(), StoreError>> + Send;
}
