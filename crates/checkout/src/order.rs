//! Immutable orders and their monetary totals.
//!
//! An order is a frozen snapshot of a cart at checkout time: its items and
//! monetary fields are copied once and never re-derived from the live cart
//! or catalog. Only the two status fields and `updated_at` change
//! afterwards, through the order service's guarded transitions.

use chrono::{DateTime, Utc};
use clementine_core::{OrderId, OrderStatus, PaymentStatus, ProductId, UserId, types::money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line of an order: the cart line as it was at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// Destination for an order's shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub full_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// A completed checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    /// Cart total at checkout, before discount.
    pub total_amount: Decimal,
    /// Coupon discount locked in at checkout; zero when none was applied.
    pub discount_amount: Decimal,
    pub coupon_code: Option<String>,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    /// `max(0, total_amount - discount_amount) + shipping_fee + tax`.
    pub grand_total: Decimal,
    pub order_status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An order about to be persisted. The store assigns the ID and
/// timestamps; both statuses start as `pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub coupon_code: Option<String>,
    pub shipping_fee: Decimal,
    pub tax: Decimal,
    pub grand_total: Decimal,
}

/// The final payable amount for an order.
///
/// The discount is clamped so it can never push the subtotal negative;
/// shipping and tax are added on top.
#[must_use]
pub fn grand_total(
    total_amount: Decimal,
    discount_amount: Decimal,
    shipping_fee: Decimal,
    tax: Decimal,
) -> Decimal {
    money::clamp_non_negative(total_amount - discount_amount) + shipping_fee + tax
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grand_total() {
        let total = grand_total(
            Decimal::from(100),
            Decimal::from(20),
            Decimal::from(5),
            Decimal::from(8),
        );
        assert_eq!(total, Decimal::from(93));
    }

    #[test]
    fn test_grand_total_clamps_oversized_discount() {
        let total = grand_total(
            Decimal::from(10),
            Decimal::from(25),
            Decimal::from(5),
            Decimal::from(2),
        );
        assert_eq!(total, Decimal::from(7));
    }

    #[test]
    fn test_grand_total_without_discount_or_fees() {
        let total = grand_total(
            Decimal::new(4599, 2),
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
        );
        assert_eq!(total, Decimal::new(4599, 2));
    }
}
