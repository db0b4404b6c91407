//! Cart operations: line-item mutations and coupon application.

use chrono::Utc;
use clementine_core::{CartItemId, ProductId, UserId};

use crate::cart::Cart;
use crate::error::{CheckoutError, Result};
use crate::store::{CartStore, CatalogStore, CouponStore};

/// Orchestrates cart mutations against the catalog, coupon, and cart
/// stores.
#[derive(Debug, Clone)]
pub struct CartService<S> {
    store: S,
}

impl<S> CartService<S>
where
    S: CatalogStore + CouponStore + CartStore,
{
    /// Create a service over a store handle.
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// The user's current cart, if one exists.
    ///
    /// Carts are created lazily by [`Self::add_item`]; a user who has never
    /// added anything has no cart, which callers render as an empty one.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Store` when the cart store fails.
    pub async fn cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        Ok(self.store.cart_for_user(user_id).await?)
    }

    /// Add `quantity` of a product to the user's cart, creating the cart
    /// on first use.
    ///
    /// The line is locked to the product's current effective price (sale
    /// price when set). If the product is already in the cart the line's
    /// quantity is incremented, and the stock check covers the combined
    /// quantity.
    ///
    /// # Errors
    ///
    /// - `NotFound` - no such product
    /// - `InvalidState` - `quantity` is zero
    /// - `InsufficientStock` - combined quantity exceeds available stock
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(CheckoutError::InvalidState(
                "quantity must be at least 1".to_owned(),
            ));
        }

        let product = self
            .store
            .product(product_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound(format!("product {product_id} not found")))?;

        let mut cart = match self.store.cart_for_user(user_id).await? {
            Some(cart) => cart,
            None => self.store.create_cart(user_id).await?,
        };

        let combined = cart.quantity_of(product_id) + quantity;
        if product.available() < combined {
            return Err(CheckoutError::InsufficientStock {
                product_id,
                requested: combined,
                available: product.available(),
            });
        }

        cart.add_item(product_id, quantity, product.effective_price());
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Set a line item's quantity; zero removes the line.
    ///
    /// The stock check runs against the product's current stock. A product
    /// that has vanished from the catalog no longer constrains the line.
    ///
    /// # Errors
    ///
    /// - `NotFound` - the user has no cart, or the item is not in it
    /// - `InsufficientStock` - quantity exceeds available stock
    pub async fn update_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> Result<Cart> {
        let mut cart = self
            .store
            .cart_for_user(user_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound("cart not found".to_owned()))?;

        let item = cart
            .item(item_id)
            .ok_or_else(|| CheckoutError::NotFound("item not found in cart".to_owned()))?;

        if quantity > 0
            && let Some(product) = self.store.product(item.product_id).await?
            && product.available() < quantity
        {
            return Err(CheckoutError::InsufficientStock {
                product_id: product.id,
                requested: quantity,
                available: product.available(),
            });
        }

        cart.set_item_quantity(item_id, quantity);
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Remove a line item.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the user has no cart or the item is not in
    /// it.
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> Result<Cart> {
        let mut cart = self
            .store
            .cart_for_user(user_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound("cart not found".to_owned()))?;

        if !cart.remove_item(item_id) {
            return Err(CheckoutError::NotFound(
                "item not found in cart".to_owned(),
            ));
        }

        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Apply a coupon code to the user's cart.
    ///
    /// The discount is computed once, against the cart's current total,
    /// and stored on the cart; later cart mutations re-derive the
    /// discounted amount from this fixed discount.
    ///
    /// # Errors
    ///
    /// - `NotFound` - no coupon matches the code
    /// - `InvalidState` - the cart is empty, or the coupon is expired or
    ///   invalid for the order amount
    pub async fn apply_coupon(&self, user_id: UserId, code: &str) -> Result<Cart> {
        let coupon = self
            .store
            .coupon_by_code(code)
            .await?
            .ok_or_else(|| CheckoutError::NotFound("invalid coupon code".to_owned()))?;

        let mut cart = self
            .store
            .cart_for_user(user_id)
            .await?
            .filter(|cart| !cart.is_empty())
            .ok_or_else(|| CheckoutError::InvalidState("cart is empty".to_owned()))?;

        let now = Utc::now();
        if !coupon.is_valid(cart.total_amount, now) {
            return Err(CheckoutError::InvalidState(
                "coupon is expired or invalid for this order".to_owned(),
            ));
        }

        let discount = coupon.discount_for(cart.total_amount, now);
        cart.apply_coupon(coupon.code, discount);
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    /// Remove any applied coupon from the user's cart.
    ///
    /// Succeeds (and changes nothing else) when no coupon is applied.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when the user has no cart.
    pub async fn remove_coupon(&self, user_id: UserId) -> Result<Cart> {
        let mut cart = self
            .store
            .cart_for_user(user_id)
            .await?
            .ok_or_else(|| CheckoutError::NotFound("cart not found".to_owned()))?;

        cart.remove_coupon();
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use chrono::Duration;
    use clementine_core::DiscountType;
    use rust_decimal::Decimal;

    use crate::coupon::NewCoupon;
    use crate::store::CouponStore as _;

    fn service() -> (CartService<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        (CartService::new(store.clone()), store)
    }

    async fn seed_coupon(store: &MemoryStore, code: &str, amount: Decimal) {
        let coupon = NewCoupon {
            code: code.to_owned(),
            description: String::new(),
            discount_type: DiscountType::Fixed,
            discount_amount: amount,
            min_purchase: Decimal::ZERO,
            max_discount: None,
            start_date: Utc::now() - Duration::days(1),
            end_date: Utc::now() + Duration::days(1),
            is_active: true,
            usage_limit: None,
        };
        store.insert_coupon(&coupon).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_item_snapshots_sale_price() {
        let (service, store) = service();
        let product =
            store.insert_product("Crate", Decimal::from(30), Decimal::from(20), 10);

        let cart = service
            .add_item(UserId::new(1), product.id, 2)
            .await
            .unwrap();
        assert_eq!(cart.total_amount, Decimal::from(40));
        assert_eq!(cart.items.first().map(|i| i.unit_price), Some(Decimal::from(20)));
    }

    #[tokio::test]
    async fn test_add_item_checks_combined_quantity() {
        let (service, store) = service();
        let product = store.insert_product("Crate", Decimal::from(10), Decimal::ZERO, 5);
        let user = UserId::new(1);

        service.add_item(user, product.id, 3).await.unwrap();
        let err = service.add_item(user, product.id, 3).await.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::InsufficientStock {
                requested: 6,
                available: 5,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_add_unknown_product_is_not_found() {
        let (service, _store) = service();
        let err = service
            .add_item(UserId::new(1), ProductId::new(99), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_apply_coupon_to_empty_cart_fails() {
        let (service, store) = service();
        seed_coupon(&store, "SAVE5", Decimal::from(5)).await;

        let err = service
            .apply_coupon(UserId::new(1), "SAVE5")
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_apply_coupon_case_insensitive() {
        let (service, store) = service();
        let product = store.insert_product("Crate", Decimal::from(50), Decimal::ZERO, 5);
        seed_coupon(&store, "SAVE5", Decimal::from(5)).await;
        let user = UserId::new(1);

        service.add_item(user, product.id, 1).await.unwrap();
        let cart = service.apply_coupon(user, "save5").await.unwrap();
        assert_eq!(
            cart.coupon.as_ref().map(|c| c.code.as_str()),
            Some("SAVE5")
        );
        assert_eq!(cart.discounted_amount, Some(Decimal::from(45)));
    }

    #[tokio::test]
    async fn test_remove_coupon_without_one_is_ok() {
        let (service, store) = service();
        let product = store.insert_product("Crate", Decimal::from(10), Decimal::ZERO, 5);
        let user = UserId::new(1);

        let before = service.add_item(user, product.id, 1).await.unwrap();
        let after = service.remove_coupon(user).await.unwrap();
        assert_eq!(after.items, before.items);
        assert_eq!(after.total_amount, before.total_amount);
        assert!(after.coupon.is_none());
    }

    #[tokio::test]
    async fn test_update_item_to_zero_removes_it() {
        let (service, store) = service();
        let product = store.insert_product("Crate", Decimal::from(10), Decimal::ZERO, 5);
        let user = UserId::new(1);

        let cart = service.add_item(user, product.id, 2).await.unwrap();
        let item_id = cart.items.first().map(|item| item.id).unwrap();

        let cart = service.update_item(user, item_id, 0).await.unwrap();
        assert!(cart.is_empty());
    }
}
