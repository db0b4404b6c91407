//! The cart aggregate.
//!
//! A cart belongs to exactly one user and holds an ordered list of line
//! items, each locked to the unit price that was current when it was
//! added. `total_amount` is derived and recomputed after every mutation;
//! when a coupon is applied, `discounted_amount` is re-derived from the new
//! total minus the coupon's discount as computed at apply time - the
//! discount itself is not re-evaluated here.

use chrono::{DateTime, Utc};
use clementine_core::{CartId, CartItemId, ProductId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line in a cart: a product at a locked-in unit price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price snapshot taken when the item was added; later catalog price
    /// changes do not affect it.
    pub unit_price: Decimal,
}

impl CartItem {
    /// `unit_price * quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Coupon state stored on a cart after a successful apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedCoupon {
    pub code: String,
    /// Discount computed at apply time against the then-current total.
    pub discount_amount: Decimal,
}

/// A user's in-progress cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<CartItem>,
    /// Derived: sum of line totals. Maintained by [`Cart::recalculate`].
    pub total_amount: Decimal,
    pub coupon: Option<AppliedCoupon>,
    /// Derived: `total_amount - coupon.discount_amount` while a coupon is
    /// applied, `None` otherwise.
    pub discounted_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Recompute the derived totals from the current items and coupon.
    ///
    /// Invoked by every mutating method; stores only need to persist the
    /// fields as-is.
    pub fn recalculate(&mut self) {
        self.total_amount = self.items.iter().map(CartItem::line_total).sum();
        self.discounted_amount = self
            .coupon
            .as_ref()
            .map(|coupon| self.total_amount - coupon.discount_amount);
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total quantity of `product_id` currently in the cart.
    #[must_use]
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.items
            .iter()
            .filter(|item| item.product_id == product_id)
            .map(|item| item.quantity)
            .sum()
    }

    /// Find a line item by ID.
    #[must_use]
    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    /// Add `quantity` of a product at `unit_price`.
    ///
    /// If the product is already a line item its quantity is incremented
    /// (the existing price snapshot wins); otherwise a new line is
    /// appended. Returns the affected line's ID.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        unit_price: Decimal,
    ) -> CartItemId {
        let id = match self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)
        {
            Some(existing) => {
                existing.quantity += quantity;
                existing.id
            }
            None => {
                let id = CartItemId::generate();
                self.items.push(CartItem {
                    id,
                    product_id,
                    quantity,
                    unit_price,
                });
                id
            }
        };
        self.recalculate();
        id
    }

    /// Set a line item's quantity; zero removes the line.
    ///
    /// Returns `false` when no line with `item_id` exists.
    pub fn set_item_quantity(&mut self, item_id: CartItemId, quantity: u32) -> bool {
        let Some(index) = self.items.iter().position(|item| item.id == item_id) else {
            return false;
        };
        if quantity == 0 {
            self.items.remove(index);
        } else if let Some(item) = self.items.get_mut(index) {
            item.quantity = quantity;
        }
        self.recalculate();
        true
    }

    /// Remove a line item. Returns `false` when no line with `item_id`
    /// exists.
    pub fn remove_item(&mut self, item_id: CartItemId) -> bool {
        let Some(index) = self.items.iter().position(|item| item.id == item_id) else {
            return false;
        };
        self.items.remove(index);
        self.recalculate();
        true
    }

    /// Store a coupon's apply-time discount on the cart.
    pub fn apply_coupon(&mut self, code: String, discount_amount: Decimal) {
        self.coupon = Some(AppliedCoupon {
            code,
            discount_amount,
        });
        self.recalculate();
    }

    /// Clear any applied coupon. A no-op when none is applied.
    pub fn remove_coupon(&mut self) {
        self.coupon = None;
        self.recalculate();
    }

    /// Empty the cart after a successful checkout: items, totals, and
    /// coupon state all reset.
    pub fn clear(&mut self) {
        self.items.clear();
        self.coupon = None;
        self.recalculate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_cart() -> Cart {
        let now = Utc::now();
        Cart {
            id: CartId::new(1),
            user_id: UserId::new(1),
            items: Vec::new(),
            total_amount: Decimal::ZERO,
            coupon: None,
            discounted_amount: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn assert_total_invariant(cart: &Cart) {
        let expected: Decimal = cart.items.iter().map(CartItem::line_total).sum();
        assert_eq!(cart.total_amount, expected);
    }

    #[test]
    fn test_total_follows_mutations() {
        let mut cart = empty_cart();
        let first = cart.add_item(ProductId::new(1), 2, Decimal::new(1050, 2));
        cart.add_item(ProductId::new(2), 1, Decimal::new(500, 2));
        assert_eq!(cart.total_amount, Decimal::new(2600, 2));
        assert_total_invariant(&cart);

        assert!(cart.set_item_quantity(first, 3));
        assert_eq!(cart.total_amount, Decimal::new(3650, 2));
        assert_total_invariant(&cart);

        assert!(cart.remove_item(first));
        assert_eq!(cart.total_amount, Decimal::new(500, 2));
        assert_total_invariant(&cart);
    }

    #[test]
    fn test_add_same_product_merges_line() {
        let mut cart = empty_cart();
        let first = cart.add_item(ProductId::new(1), 1, Decimal::from(10));
        let second = cart.add_item(ProductId::new(1), 2, Decimal::from(12));
        assert_eq!(first, second);
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.quantity_of(ProductId::new(1)), 3);
        // The original snapshot price wins
        assert_eq!(cart.total_amount, Decimal::from(30));
    }

    #[test]
    fn test_zero_quantity_removes_line() {
        let mut cart = empty_cart();
        let id = cart.add_item(ProductId::new(1), 2, Decimal::from(10));
        assert!(cart.set_item_quantity(id, 0));
        assert!(cart.is_empty());
        assert_eq!(cart.total_amount, Decimal::ZERO);
    }

    #[test]
    fn test_missing_item_reports_false() {
        let mut cart = empty_cart();
        let ghost = CartItemId::generate();
        assert!(!cart.set_item_quantity(ghost, 1));
        assert!(!cart.remove_item(ghost));
    }

    #[test]
    fn test_discounted_amount_tracks_total() {
        let mut cart = empty_cart();
        let id = cart.add_item(ProductId::new(1), 10, Decimal::from(10));
        cart.apply_coupon("SAVE20".to_owned(), Decimal::from(20));
        assert_eq!(cart.discounted_amount, Some(Decimal::from(80)));

        // Shrinking the cart keeps the apply-time discount fixed and only
        // re-derives the subtraction.
        assert!(cart.set_item_quantity(id, 5));
        assert_eq!(cart.total_amount, Decimal::from(50));
        assert_eq!(cart.discounted_amount, Some(Decimal::from(30)));
    }

    #[test]
    fn test_remove_coupon_is_idempotent() {
        let mut cart = empty_cart();
        cart.add_item(ProductId::new(1), 1, Decimal::from(10));
        let before = cart.clone();

        cart.remove_coupon();
        assert_eq!(cart.items, before.items);
        assert_eq!(cart.total_amount, before.total_amount);
        assert!(cart.coupon.is_none());
        assert!(cart.discounted_amount.is_none());
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut cart = empty_cart();
        cart.add_item(ProductId::new(1), 2, Decimal::from(15));
        cart.apply_coupon("SAVE".to_owned(), Decimal::from(5));

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.total_amount, Decimal::ZERO);
        assert!(cart.coupon.is_none());
        assert!(cart.discounted_amount.is_none());
    }
}
