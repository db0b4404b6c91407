//! Integration tests for Clementine.
//!
//! The scenarios in `tests/` run the whole checkout pipeline - cart
//! mutations, coupon application, order assembly, and lifecycle - over the
//! in-memory store, with both services sharing one store handle exactly as
//! the server wires them over Postgres.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p clementine-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use chrono::{Duration, Utc};
use clementine_checkout::coupon::{Coupon, NewCoupon};
use clementine_checkout::order::ShippingAddress;
use clementine_checkout::service::{CartService, CreateOrderInput, OrderService};
use clementine_checkout::store::CouponStore as _;
use clementine_checkout::store::memory::MemoryStore;
use clementine_core::DiscountType;
use rust_decimal::Decimal;

/// A store plus the two services wired over it, like the server's
/// `AppState`.
pub struct TestContext {
    pub store: MemoryStore,
    pub carts: CartService<MemoryStore>,
    pub orders: OrderService<MemoryStore>,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        let store = MemoryStore::new();
        Self {
            carts: CartService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            store,
        }
    }

    /// Seed a coupon that is active for the next 30 days.
    ///
    /// # Panics
    ///
    /// Panics when the code is already taken.
    pub async fn seed_coupon(
        &self,
        code: &str,
        discount_type: DiscountType,
        amount: Decimal,
        max_discount: Option<Decimal>,
    ) -> Coupon {
        let coupon = NewCoupon {
            code: code.to_owned(),
            description: format!("{code} test coupon"),
            discount_type,
            discount_amount: amount,
            min_purchase: Decimal::ZERO,
            max_discount,
            start_date: Utc::now() - Duration::days(1),
            end_date: Utc::now() + Duration::days(30),
            is_active: true,
            usage_limit: None,
        };
        self.store
            .insert_coupon(&coupon)
            .await
            .expect("seed coupon")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A plausible shipping address.
#[must_use]
pub fn shipping_address() -> ShippingAddress {
    ShippingAddress {
        full_name: "Ada Shopper".to_owned(),
        line1: "1 Orchard Way".to_owned(),
        line2: Some("Apt 2".to_owned()),
        city: "Fruitvale".to_owned(),
        postal_code: "94601".to_owned(),
        country: "US".to_owned(),
        phone: Some("+1 555 0100".to_owned()),
    }
}

/// Checkout input with the given shipping fee and tax.
#[must_use]
pub fn checkout_input(shipping_fee: Decimal, tax: Decimal) -> CreateOrderInput {
    CreateOrderInput {
        shipping_address: shipping_address(),
        payment_method: "card".to_owned(),
        shipping_fee,
        tax,
    }
}
