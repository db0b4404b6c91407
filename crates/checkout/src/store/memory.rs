//! In-memory store for tests and local development.
//!
//! Backs every store trait with plain collections behind a mutex. State is
//! shared across clones, so the cart and order services can each hold a
//! handle to the same store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use clementine_core::{CartId, CouponId, OrderId, ProductId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::cart::Cart;
use crate::catalog::Product;
use crate::coupon::{Coupon, NewCoupon};
use crate::order::{NewOrder, Order};
use crate::store::{CartStore, CatalogStore, CouponStore, OrderStore, StoreError};

#[derive(Debug, Error)]
#[error("coupon code already exists")]
struct DuplicateCouponCode;

#[derive(Debug, Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    coupons: Vec<Coupon>,
    carts: HashMap<UserId, Cart>,
    orders: Vec<Order>,
    next_product_id: i32,
    next_coupon_id: i32,
    next_cart_id: i32,
    next_order_id: i32,
}

/// Shared in-memory implementation of all four store traits.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means a test thread panicked mid-write;
        // the data is still usable for the remaining assertions.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed a product into the catalog.
    pub fn insert_product(
        &self,
        name: &str,
        price: Decimal,
        sale_price: Decimal,
        stock: i32,
    ) -> Product {
        let mut inner = self.lock();
        inner.next_product_id += 1;
        let product = Product {
            id: ProductId::new(inner.next_product_id),
            name: name.to_owned(),
            price,
            sale_price,
            stock,
        };
        inner.products.insert(product.id, product.clone());
        product
    }

    /// Current stock for a product, for test assertions.
    #[must_use]
    pub fn stock_of(&self, id: ProductId) -> Option<i32> {
        self.lock().products.get(&id).map(|product| product.stock)
    }

    /// Change a product's catalog prices, for tests that exercise the
    /// snapshot-price behavior of cart lines.
    pub fn set_product_price(&self, id: ProductId, price: Decimal, sale_price: Decimal) {
        if let Some(product) = self.lock().products.get_mut(&id) {
            product.price = price;
            product.sale_price = sale_price;
        }
    }
}

impl CatalogStore for MemoryStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.lock().products.get(&id).cloned())
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let Some(product) = inner.products.get_mut(&id) else {
            return Ok(false);
        };
        let quantity = i64::from(quantity);
        if i64::from(product.stock) < quantity {
            return Ok(false);
        }
        product.stock -= i32::try_from(quantity)
            .map_err(|_| StoreError::DataCorruption("quantity exceeds i32".to_owned()))?;
        Ok(true)
    }

    async fn increment_stock(&self, id: ProductId, quantity: u32) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(product) = inner.products.get_mut(&id) {
            let quantity = i32::try_from(quantity)
                .map_err(|_| StoreError::DataCorruption("quantity exceeds i32".to_owned()))?;
            product.stock = product.stock.saturating_add(quantity);
        }
        Ok(())
    }
}

impl CouponStore for MemoryStore {
    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(self
            .lock()
            .coupons
            .iter()
            .find(|coupon| coupon.code.eq_ignore_ascii_case(code))
            .cloned())
    }

    async fn coupon(&self, id: CouponId) -> Result<Option<Coupon>, StoreError> {
        Ok(self
            .lock()
            .coupons
            .iter()
            .find(|coupon| coupon.id == id)
            .cloned())
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>, StoreError> {
        Ok(self.lock().coupons.iter().rev().cloned().collect())
    }

    async fn insert_coupon(&self, coupon: &NewCoupon) -> Result<Coupon, StoreError> {
        let mut inner = self.lock();
        if inner
            .coupons
            .iter()
            .any(|existing| existing.code.eq_ignore_ascii_case(&coupon.code))
        {
            return Err(StoreError::backend(DuplicateCouponCode));
        }
        inner.next_coupon_id += 1;
        let stored = Coupon {
            id: CouponId::new(inner.next_coupon_id),
            code: coupon.code.clone(),
            description: coupon.description.clone(),
            discount_type: coupon.discount_type,
            discount_amount: coupon.discount_amount,
            min_purchase: coupon.min_purchase,
            max_discount: coupon.max_discount,
            start_date: coupon.start_date,
            end_date: coupon.end_date,
            is_active: coupon.is_active,
            usage_limit: coupon.usage_limit,
            usage_count: 0,
            created_at: Utc::now(),
        };
        inner.coupons.push(stored.clone());
        Ok(stored)
    }

    async fn update_coupon(&self, coupon: &Coupon) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        match inner
            .coupons
            .iter_mut()
            .find(|existing| existing.id == coupon.id)
        {
            Some(existing) => {
                *existing = coupon.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_coupon(&self, id: CouponId) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        let before = inner.coupons.len();
        inner.coupons.retain(|coupon| coupon.id != id);
        Ok(inner.coupons.len() < before)
    }

    async fn increment_usage(&self, id: CouponId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(coupon) = inner.coupons.iter_mut().find(|coupon| coupon.id == id) {
            coupon.usage_count += 1;
        }
        Ok(())
    }
}

impl CartStore for MemoryStore {
    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        Ok(self.lock().carts.get(&user_id).cloned())
    }

    async fn create_cart(&self, user_id: UserId) -> Result<Cart, StoreError> {
        let mut inner = self.lock();
        inner.next_cart_id += 1;
        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(inner.next_cart_id),
            user_id,
            items: Vec::new(),
            total_amount: Decimal::ZERO,
            coupon: None,
            discounted_amount: None,
            created_at: now,
            updated_at: now,
        };
        inner.carts.insert(user_id, cart.clone());
        Ok(cart)
    }

    async fn save_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        let mut saved = cart.clone();
        saved.updated_at = Utc::now();
        self.lock().carts.insert(saved.user_id, saved);
        Ok(())
    }
}

impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, StoreError> {
        let mut inner = self.lock();
        inner.next_order_id += 1;
        let now = Utc::now();
        let stored = Order {
            id: OrderId::new(inner.next_order_id),
            user_id: order.user_id,
            items: order.items.clone(),
            shipping_address: order.shipping_address.clone(),
            payment_method: order.payment_method.clone(),
            total_amount: order.total_amount,
            discount_amount: order.discount_amount,
            coupon_code: order.coupon_code.clone(),
            shipping_fee: order.shipping_fee,
            tax: order.tax,
            grand_total: order.grand_total,
            order_status: clementine_core::OrderStatus::Pending,
            payment_status: clementine_core::PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        inner.orders.push(stored.clone());
        Ok(stored)
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .find(|order| order.id == id)
            .cloned())
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        Ok(self
            .lock()
            .orders
            .iter()
            .rev()
            .filter(|order| order.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_orders(&self) -> Result<Vec<Order>, StoreError> {
        Ok(self.lock().orders.iter().rev().cloned().collect())
    }

    async fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(existing) = inner
            .orders
            .iter_mut()
            .find(|existing| existing.id == order.id)
        {
            *existing = order.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_decrement_stock_is_guarded() {
        let store = MemoryStore::new();
        let product = store.insert_product("Crate", Decimal::from(10), Decimal::ZERO, 3);

        assert!(store.decrement_stock(product.id, 2).await.unwrap());
        assert_eq!(store.stock_of(product.id), Some(1));

        // Guard refuses to go negative and leaves stock untouched
        assert!(!store.decrement_stock(product.id, 2).await.unwrap());
        assert_eq!(store.stock_of(product.id), Some(1));
    }

    #[tokio::test]
    async fn test_coupon_code_lookup_is_case_insensitive() {
        let store = MemoryStore::new();
        let coupon = NewCoupon {
            code: "SAVE10".to_owned(),
            description: String::new(),
            discount_type: clementine_core::DiscountType::Fixed,
            discount_amount: Decimal::from(10),
            min_purchase: Decimal::ZERO,
            max_discount: None,
            start_date: Utc::now(),
            end_date: Utc::now() + chrono::Duration::days(1),
            is_active: true,
            usage_limit: None,
        };
        store.insert_coupon(&coupon).await.unwrap();

        let found = store.coupon_by_code("save10").await.unwrap();
        assert_eq!(found.map(|c| c.code), Some("SAVE10".to_owned()));
    }

    #[tokio::test]
    async fn test_duplicate_coupon_code_is_rejected() {
        let store = MemoryStore::new();
        let coupon = NewCoupon {
            code: "TWICE".to_owned(),
            description: String::new(),
            discount_type: clementine_core::DiscountType::Fixed,
            discount_amount: Decimal::ONE,
            min_purchase: Decimal::ZERO,
            max_discount: None,
            start_date: Utc::now(),
            end_date: Utc::now() + chrono::Duration::days(1),
            is_active: true,
            usage_limit: None,
        };
        store.insert_coupon(&coupon).await.unwrap();
        assert!(store.insert_coupon(&coupon).await.is_err());
    }

    #[tokio::test]
    async fn test_one_cart_per_user() {
        let store = MemoryStore::new();
        let user = UserId::new(1);
        let first = store.create_cart(user).await.unwrap();
        let found = store.cart_for_user(user).await.unwrap().unwrap();
        assert_eq!(first.id, found.id);
    }
}
