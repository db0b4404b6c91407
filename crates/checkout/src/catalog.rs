//! Product records as the checkout pipeline sees them.
//!
//! The catalog itself (creation, editing, media, categorization) belongs to
//! another part of the system; checkout only reads prices and stock and
//! adjusts stock through the [`crate::store::CatalogStore`] seam.

use clementine_core::ProductId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product as read from the catalog store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Regular price in the currency's standard unit.
    pub price: Decimal,
    /// Sale price; zero means the product is not on sale.
    pub sale_price: Decimal,
    /// Units available. Never negative in the store.
    pub stock: i32,
}

impl Product {
    /// The price a new cart line is locked to: the sale price when one is
    /// set, otherwise the regular price.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        if self.sale_price > Decimal::ZERO {
            self.sale_price
        } else {
            self.price
        }
    }

    /// Available stock as an unsigned count.
    #[must_use]
    pub fn available(&self) -> u32 {
        u32::try_from(self.stock).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price: Decimal, sale_price: Decimal) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Clementine Crate".to_owned(),
            price,
            sale_price,
            stock: 10,
        }
    }

    #[test]
    fn test_effective_price_prefers_sale_price() {
        let p = product(Decimal::new(2999, 2), Decimal::new(1999, 2));
        assert_eq!(p.effective_price(), Decimal::new(1999, 2));
    }

    #[test]
    fn test_effective_price_ignores_zero_sale_price() {
        let p = product(Decimal::new(2999, 2), Decimal::ZERO);
        assert_eq!(p.effective_price(), Decimal::new(2999, 2));
    }

    #[test]
    fn test_available_clamps_negative_stock() {
        let mut p = product(Decimal::ONE, Decimal::ZERO);
        p.stock = -3;
        assert_eq!(p.available(), 0);
    }
}
