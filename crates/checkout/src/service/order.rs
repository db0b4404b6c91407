//! Order assembly and lifecycle.
//!
//! `create_order` freezes a cart into an immutable order. Stock is
//! reserved through guarded per-item decrements before the order is
//! persisted; if any decrement fails, the ones already applied are
//! compensated and nothing is written. Lifecycle transitions go through
//! the strict forward-only graphs on `OrderStatus`/`PaymentStatus`.

use chrono::Utc;
use clementine_core::{OrderId, OrderStatus, PaymentStatus, ProductId, UserId};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::{CheckoutError, Result};
use crate::order::{self, NewOrder, Order, OrderItem, ShippingAddress};
use crate::service::Requester;
use crate::store::{CartStore, CatalogStore, CouponStore, OrderStore};

/// Input for creating an order from the user's cart.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderInput {
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default)]
    pub shipping_fee: Decimal,
    #[serde(default)]
    pub tax: Decimal,
}

/// Admin status update; absent fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct StatusUpdate {
    pub order_status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

/// Orchestrates order creation and lifecycle against the catalog, coupon,
/// cart, and order stores.
#[derive(Debug, Clone)]
pub struct OrderService<S> {
    store: S,
}

impl<S> OrderService<S>
where
    S: CatalogStore + CouponStore + CartStore + OrderStore,
{
    /// Create a service over a store handle.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Convert the user's cart into an order.
    ///
    /// Copies the cart's items and coupon state into an immutable order,
    /// reserves stock, persists the order with `pending/pending` statuses,
    /// records the coupon redemption, and clears the cart. Stock
    /// reservation and order insertion are one logical unit: any failure
    /// releases the stock already reserved and leaves no order behind.
    ///
    /// # Errors
    ///
    /// - `InvalidState` - the cart is empty, or a fee is negative
    /// - `InsufficientStock` - a line's quantity exceeds available stock
    pub async fn create_order(&self, user_id: UserId, input: CreateOrderInput) -> Result<Order> {
        if input.shipping_fee < Decimal::ZERO || input.tax < Decimal::ZERO {
            return Err(CheckoutError::InvalidState(
                "shipping fee and tax must not be negative".to_owned(),
            ));
        }

        let mut cart = self
            .store
            .cart_for_user(user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or_else(|| CheckoutError::InvalidState("cart is empty".to_owned()))?;

        let items: Vec<OrderItem> = cart
            .items
            .iter()
            .map(|item| OrderItem {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.unit_price,
            })
            .collect();

        self.reserve_stock(&items).await?;

        let discount_amount = cart
            .coupon
            .as_ref()
            .map_or(Decimal::ZERO, |coupon| coupon.discount_amount);
        let new_order = NewOrder {
            user_id,
            items,
            shipping_address: input.shipping_address,
            payment_method: input.payment_method,
            total_amount: cart.total_amount,
            discount_amount,
            coupon_code: cart.coupon.as_ref().map(|coupon| coupon.code.clone()),
            shipping_fee: input.shipping_fee,
            tax: input.tax,
            grand_total: order::grand_total(
                cart.total_amount,
                discount_amount,
                input.shipping_fee,
                input.tax,
            ),
        };

        let order = match self.store.insert_order(&new_order).await {
            Ok(order) => order,
            Err(err) => {
                self.release_stock(&new_order.items).await;
                return Err(err.into());
            }
        };

        self.record_coupon_usage(&order).await;

        cart.clear();
        self.store.save_cart(&cart).await?;

        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            grand_total = %order.grand_total,
            "order created"
        );
        Ok(order)
    }

    /// Fetch an order, enforcing owner-or-admin access.
    ///
    /// # Errors
    ///
    /// - `NotFound` - no such order
    /// - `Unauthorized` - requester is neither the owner nor an admin
    pub async fn order(&self, requester: Requester, id: OrderId) -> Result<Order> {
        let order = self
            .store
            .order(id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {id} not found")))?;

        if !requester.can_access(order.user_id) {
            return Err(CheckoutError::Unauthorized(
                "not authorized to access this order".to_owned(),
            ));
        }

        Ok(order)
    }

    /// List orders, newest first: all of them for admins, the requester's
    /// own otherwise.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Store` when the order store fails.
    pub async fn orders(&self, requester: Requester) -> Result<Vec<Order>> {
        let orders = if requester.is_admin() {
            self.store.all_orders().await?
        } else {
            self.store.orders_for_user(requester.user_id).await?
        };
        Ok(orders)
    }

    /// Apply an admin status update with forward-only transition guards.
    ///
    /// `cancelled` is not reachable here: cancellation restores stock and
    /// must go through [`Self::cancel`].
    ///
    /// # Errors
    ///
    /// - `Unauthorized` - requester is not an admin
    /// - `NotFound` - no such order
    /// - `InvalidState` - an illegal transition was requested
    pub async fn update_status(
        &self,
        requester: Requester,
        id: OrderId,
        update: StatusUpdate,
    ) -> Result<Order> {
        if !requester.is_admin() {
            return Err(CheckoutError::Unauthorized(
                "admin access required".to_owned(),
            ));
        }

        let mut order = self
            .store
            .order(id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {id} not found")))?;

        if let Some(next) = update.order_status {
            if next == OrderStatus::Cancelled && order.order_status != OrderStatus::Cancelled {
                return Err(CheckoutError::InvalidState(
                    "orders are cancelled through the cancel operation".to_owned(),
                ));
            }
            if !order.order_status.can_transition_to(next) {
                return Err(CheckoutError::InvalidState(format!(
                    "cannot move order from {} to {next}",
                    order.order_status
                )));
            }
            order.order_status = next;
        }

        if let Some(next) = update.payment_status {
            if !order.payment_status.can_transition_to(next) {
                return Err(CheckoutError::InvalidState(format!(
                    "cannot move payment from {} to {next}",
                    order.payment_status
                )));
            }
            order.payment_status = next;
        }

        order.updated_at = Utc::now();
        self.store.update_order(&order).await?;
        Ok(order)
    }

    /// Cancel a still-pending order and return its items to stock.
    ///
    /// # Errors
    ///
    /// - `NotFound` - no such order
    /// - `Unauthorized` - requester is neither the owner nor an admin
    /// - `InvalidState` - the order has already left `pending`
    pub async fn cancel(&self, requester: Requester, id: OrderId) -> Result<Order> {
        let mut order = self
            .store
            .order(id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {id} not found")))?;

        if !requester.can_access(order.user_id) {
            return Err(CheckoutError::Unauthorized(
                "not authorized to cancel this order".to_owned(),
            ));
        }

        if order.order_status != OrderStatus::Pending {
            return Err(CheckoutError::InvalidState(
                "cannot cancel an order that has been processed".to_owned(),
            ));
        }

        for item in &order.items {
            self.store
                .increment_stock(item.product_id, item.quantity)
                .await?;
        }

        order.order_status = OrderStatus::Cancelled;
        order.updated_at = Utc::now();
        self.store.update_order(&order).await?;

        tracing::info!(order_id = %order.id, "order cancelled");
        Ok(order)
    }

    /// Handle the payment collaborator confirming a charge: payment
    /// completes and the order moves to `processing`.
    ///
    /// # Errors
    ///
    /// - `NotFound` - no such order
    /// - `InvalidState` - the order's statuses cannot accept the
    ///   confirmation (already failed, refunded, or cancelled)
    pub async fn payment_confirmed(&self, id: OrderId) -> Result<Order> {
        let mut order = self
            .store
            .order(id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {id} not found")))?;

        if !order.payment_status.can_transition_to(PaymentStatus::Completed) {
            return Err(CheckoutError::InvalidState(format!(
                "cannot complete payment from {}",
                order.payment_status
            )));
        }
        if !order.order_status.can_transition_to(OrderStatus::Processing) {
            return Err(CheckoutError::InvalidState(format!(
                "cannot move order from {} to processing",
                order.order_status
            )));
        }

        order.payment_status = PaymentStatus::Completed;
        order.order_status = OrderStatus::Processing;
        order.updated_at = Utc::now();
        self.store.update_order(&order).await?;

        tracing::info!(order_id = %order.id, "payment confirmed");
        Ok(order)
    }

    /// Handle the payment collaborator reporting a failed charge.
    ///
    /// # Errors
    ///
    /// - `NotFound` - no such order
    /// - `InvalidState` - payment already completed, failed, or refunded
    pub async fn payment_failed(&self, id: OrderId) -> Result<Order> {
        let mut order = self
            .store
            .order(id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("order {id} not found")))?;

        if !order.payment_status.can_transition_to(PaymentStatus::Failed) {
            return Err(CheckoutError::InvalidState(format!(
                "cannot fail payment from {}",
                order.payment_status
            )));
        }

        order.payment_status = PaymentStatus::Failed;
        order.updated_at = Utc::now();
        self.store.update_order(&order).await?;

        tracing::warn!(order_id = %order.id, "payment failed");
        Ok(order)
    }

    /// Reserve stock for every line, compensating on partial failure.
    async fn reserve_stock(&self, items: &[OrderItem]) -> Result<()> {
        let mut reserved: Vec<(ProductId, u32)> = Vec::with_capacity(items.len());

        for item in items {
            match self.store.decrement_stock(item.product_id, item.quantity).await {
                Ok(true) => reserved.push((item.product_id, item.quantity)),
                Ok(false) => {
                    let available = self
                        .store
                        .product(item.product_id)
                        .await
                        .ok()
                        .flatten()
                        .map_or(0, |product| product.available());
                    self.release(&reserved).await;
                    return Err(CheckoutError::InsufficientStock {
                        product_id: item.product_id,
                        requested: item.quantity,
                        available,
                    });
                }
                Err(err) => {
                    self.release(&reserved).await;
                    return Err(err.into());
                }
            }
        }

        Ok(())
    }

    /// Release stock reserved for every line of a failed order.
    async fn release_stock(&self, items: &[OrderItem]) {
        let reserved: Vec<(ProductId, u32)> = items
            .iter()
            .map(|item| (item.product_id, item.quantity))
            .collect();
        self.release(&reserved).await;
    }

    async fn release(&self, reserved: &[(ProductId, u32)]) {
        for &(product_id, quantity) in reserved {
            if let Err(err) = self.store.increment_stock(product_id, quantity).await {
                tracing::warn!(
                    product_id = %product_id,
                    quantity,
                    error = %err,
                    "failed to release reserved stock"
                );
            }
        }
    }

    /// Record the redemption of the order's coupon, if any.
    ///
    /// Best-effort once the order exists: a missing coupon (deleted since
    /// apply time) or a store failure is logged, not surfaced.
    async fn record_coupon_usage(&self, order: &Order) {
        let Some(code) = order.coupon_code.as_deref() else {
            return;
        };
        match self.store.coupon_by_code(code).await {
            Ok(Some(coupon)) => {
                if let Err(err) = self.store.increment_usage(coupon.id).await {
                    tracing::warn!(code, error = %err, "failed to record coupon usage");
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(code, error = %err, "failed to look up coupon for usage count");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::CartService;
    use crate::store::memory::MemoryStore;
    use chrono::Duration;
    use clementine_core::DiscountType;

    use crate::coupon::NewCoupon;
    use crate::store::CouponStore as _;

    fn services() -> (CartService<MemoryStore>, OrderService<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        (
            CartService::new(store.clone()),
            OrderService::new(store.clone()),
            store,
        )
    }

    fn address() -> ShippingAddress {
        ShippingAddress {
            full_name: "Ada Shopper".to_owned(),
            line1: "1 Orchard Way".to_owned(),
            line2: None,
            city: "Fruitvale".to_owned(),
            postal_code: "94601".to_owned(),
            country: "US".to_owned(),
            phone: None,
        }
    }

    fn input() -> CreateOrderInput {
        CreateOrderInput {
            shipping_address: address(),
            payment_method: "card".to_owned(),
            shipping_fee: Decimal::from(5),
            tax: Decimal::from(8),
        }
    }

    #[tokio::test]
    async fn test_create_order_from_empty_cart_fails() {
        let (_carts, orders, _store) = services();
        let err = orders
            .create_order(UserId::new(1), input())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_create_order_totals_and_side_effects() {
        let (carts, orders, store) = services();
        let product = store.insert_product("Crate", Decimal::from(50), Decimal::ZERO, 10);
        let user = UserId::new(1);

        carts.add_item(user, product.id, 2).await.unwrap();
        let coupon = NewCoupon {
            code: "SAVE20".to_owned(),
            description: String::new(),
            discount_type: DiscountType::Fixed,
            discount_amount: Decimal::from(20),
            min_purchase: Decimal::ZERO,
            max_discount: None,
            start_date: Utc::now() - Duration::days(1),
            end_date: Utc::now() + Duration::days(1),
            is_active: true,
            usage_limit: None,
        };
        let stored_coupon = store.insert_coupon(&coupon).await.unwrap();
        carts.apply_coupon(user, "SAVE20").await.unwrap();

        let order = orders.create_order(user, input()).await.unwrap();

        // grand_total = max(0, 100 - 20) + 5 + 8
        assert_eq!(order.total_amount, Decimal::from(100));
        assert_eq!(order.discount_amount, Decimal::from(20));
        assert_eq!(order.grand_total, Decimal::from(93));
        assert_eq!(order.order_status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);

        // Stock deducted, cart cleared, coupon redemption recorded
        assert_eq!(store.stock_of(product.id), Some(8));
        let cart = carts.cart(user).await.unwrap().unwrap();
        assert!(cart.is_empty());
        assert!(cart.coupon.is_none());
        let coupon = store.coupon(stored_coupon.id).await.unwrap().unwrap();
        assert_eq!(coupon.usage_count, 1);
    }

    #[tokio::test]
    async fn test_create_order_insufficient_stock_releases_reservation() {
        let (carts, orders, store) = services();
        let plenty = store.insert_product("Plenty", Decimal::from(10), Decimal::ZERO, 10);
        let scarce = store.insert_product("Scarce", Decimal::from(10), Decimal::ZERO, 3);
        let user = UserId::new(1);

        carts.add_item(user, plenty.id, 2).await.unwrap();
        carts.add_item(user, scarce.id, 3).await.unwrap();

        // Another order drains the scarce product between add and checkout
        let rival = UserId::new(2);
        carts.add_item(rival, scarce.id, 2).await.unwrap();
        orders
            .create_order(
                rival,
                CreateOrderInput {
                    shipping_fee: Decimal::ZERO,
                    tax: Decimal::ZERO,
                    ..input()
                },
            )
            .await
            .unwrap();

        let err = orders.create_order(user, input()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InsufficientStock { .. }));

        // The decrement already applied to the first line was compensated
        assert_eq!(store.stock_of(plenty.id), Some(10));
        assert_eq!(store.stock_of(scarce.id), Some(1));

        // And the cart survives for the user to fix up
        assert!(!carts.cart(user).await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_only_from_pending() {
        let (carts, orders, store) = services();
        let product = store.insert_product("Crate", Decimal::from(10), Decimal::ZERO, 6);
        let user = UserId::new(1);

        carts.add_item(user, product.id, 4).await.unwrap();
        let order = orders.create_order(user, input()).await.unwrap();
        assert_eq!(store.stock_of(product.id), Some(2));

        let cancelled = orders
            .cancel(Requester::customer(user), order.id)
            .await
            .unwrap();
        assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
        assert_eq!(store.stock_of(product.id), Some(6));

        // A cancelled order cannot be cancelled again
        let err = orders
            .cancel(Requester::admin(UserId::new(9)), order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_cancel_requires_owner_or_admin() {
        let (carts, orders, store) = services();
        let product = store.insert_product("Crate", Decimal::from(10), Decimal::ZERO, 5);
        let user = UserId::new(1);

        carts.add_item(user, product.id, 1).await.unwrap();
        let order = orders.create_order(user, input()).await.unwrap();

        let err = orders
            .cancel(Requester::customer(UserId::new(2)), order.id)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Unauthorized(_)));

        orders
            .cancel(Requester::admin(UserId::new(2)), order.id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_status_enforces_forward_only() {
        let (carts, orders, store) = services();
        let product = store.insert_product("Crate", Decimal::from(10), Decimal::ZERO, 5);
        let user = UserId::new(1);
        let admin = Requester::admin(UserId::new(9));

        carts.add_item(user, product.id, 1).await.unwrap();
        let order = orders.create_order(user, input()).await.unwrap();

        // pending -> delivered skips two states
        let err = orders
            .update_status(
                admin,
                order.id,
                StatusUpdate {
                    order_status: Some(OrderStatus::Delivered),
                    payment_status: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidState(_)));

        // cancelled is reserved for the cancel operation
        let err = orders
            .update_status(
                admin,
                order.id,
                StatusUpdate {
                    order_status: Some(OrderStatus::Cancelled),
                    payment_status: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidState(_)));

        // the legal path works one step at a time
        for next in [
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
        ] {
            orders
                .update_status(
                    admin,
                    order.id,
                    StatusUpdate {
                        order_status: Some(next),
                        payment_status: None,
                    },
                )
                .await
                .unwrap();
        }

        // non-admins are rejected outright
        let err = orders
            .update_status(Requester::customer(user), order.id, StatusUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_payment_confirmation_moves_order_to_processing() {
        let (carts, orders, store) = services();
        let product = store.insert_product("Crate", Decimal::from(10), Decimal::ZERO, 5);
        let user = UserId::new(1);

        carts.add_item(user, product.id, 1).await.unwrap();
        let order = orders.create_order(user, input()).await.unwrap();

        let confirmed = orders.payment_confirmed(order.id).await.unwrap();
        assert_eq!(confirmed.payment_status, PaymentStatus::Completed);
        assert_eq!(confirmed.order_status, OrderStatus::Processing);

        // A failure report after completion is rejected
        let err = orders.payment_failed(order.id).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_payment_confirmation_rejected_for_cancelled_order() {
        let (carts, orders, store) = services();
        let product = store.insert_product("Crate", Decimal::from(10), Decimal::ZERO, 5);
        let user = UserId::new(1);

        carts.add_item(user, product.id, 1).await.unwrap();
        let order = orders.create_order(user, input()).await.unwrap();
        orders
            .cancel(Requester::customer(user), order.id)
            .await
            .unwrap();

        let err = orders.payment_confirmed(order.id).await.unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidState(_)));
    }
}
