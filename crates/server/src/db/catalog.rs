//! Catalog store implementation: product reads and stock adjustments.

use clementine_checkout::catalog::Product;
use clementine_checkout::store::{CatalogStore, StoreError};
use clementine_core::ProductId;
use rust_decimal::Decimal;

use super::PgStore;

/// Internal row type for product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: Decimal,
    sale_price: Decimal,
    stock: i32,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            price: row.price,
            sale_price: row.sale_price,
            stock: row.stock,
        }
    }
}

fn quantity_to_i32(quantity: u32) -> Result<i32, StoreError> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::DataCorruption(format!("quantity {quantity} exceeds i32")))
}

impl CatalogStore for PgStore {
    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, price, sale_price, stock
            FROM checkout.product
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::backend)?;

        Ok(row.map(Into::into))
    }

    async fn decrement_stock(&self, id: ProductId, quantity: u32) -> Result<bool, StoreError> {
        // The stock guard lives in the WHERE clause so check and write are
        // a single statement; concurrent checkouts cannot oversell.
        let result = sqlx::query(
            r"
            UPDATE checkout.product
            SET stock = stock - $2, updated_at = now()
            WHERE id = $1 AND stock >= $2
            ",
        )
        .bind(id.as_i32())
        .bind(quantity_to_i32(quantity)?)
        .execute(self.pool())
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_stock(&self, id: ProductId, quantity: u32) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE checkout.product
            SET stock = stock + $2, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id.as_i32())
        .bind(quantity_to_i32(quantity)?)
        .execute(self.pool())
        .await
        .map_err(StoreError::backend)?;

        Ok(())
    }
}
