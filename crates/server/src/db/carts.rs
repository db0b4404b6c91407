//! Cart store implementation.
//!
//! A cart is one row in `checkout.cart` plus its line items; saves rewrite
//! the item set and the derived totals in a single transaction.

use chrono::{DateTime, Utc};
use clementine_checkout::cart::{AppliedCoupon, Cart, CartItem};
use clementine_checkout::store::{CartStore, StoreError};
use clementine_core::{CartId, CartItemId, ProductId, UserId};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::PgStore;

/// Internal row type for cart header queries.
#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    total_amount: Decimal,
    coupon_code: Option<String>,
    coupon_discount: Option<Decimal>,
    discounted_amount: Option<Decimal>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Internal row type for cart line items.
#[derive(Debug, sqlx::FromRow)]
struct CartItemRow {
    id: Uuid,
    product_id: i32,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = StoreError;

    fn try_from(row: CartItemRow) -> Result<Self, StoreError> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            StoreError::DataCorruption(format!("cart item {}: negative quantity", row.id))
        })?;
        Ok(Self {
            id: CartItemId::from_uuid(row.id),
            product_id: ProductId::new(row.product_id),
            quantity,
            unit_price: row.unit_price,
        })
    }
}

fn assemble_cart(row: CartRow, items: Vec<CartItem>) -> Result<Cart, StoreError> {
    let coupon = match (row.coupon_code, row.coupon_discount) {
        (Some(code), Some(discount_amount)) => Some(AppliedCoupon {
            code,
            discount_amount,
        }),
        (None, _) => None,
        (Some(code), None) => {
            return Err(StoreError::DataCorruption(format!(
                "cart {}: coupon {code} has no discount amount",
                row.id
            )));
        }
    };

    Ok(Cart {
        id: CartId::new(row.id),
        user_id: UserId::new(row.user_id),
        items,
        total_amount: row.total_amount,
        coupon,
        discounted_amount: row.discounted_amount,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

const CART_COLUMNS: &str = r"
    id, user_id, total_amount, coupon_code, coupon_discount,
    discounted_amount, created_at, updated_at
";

impl CartStore for PgStore {
    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>, StoreError> {
        let row = sqlx::query_as::<_, CartRow>(&format!(
            "SELECT {CART_COLUMNS} FROM checkout.cart WHERE user_id = $1"
        ))
        .bind(user_id.as_i32())
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows = sqlx::query_as::<_, CartItemRow>(
            r"
            SELECT id, product_id, quantity, unit_price
            FROM checkout.cart_item
            WHERE cart_id = $1
            ORDER BY line_no
            ",
        )
        .bind(row.id)
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::backend)?;

        let items = item_rows
            .into_iter()
            .map(TryInto::try_into)
            .collect::<Result<Vec<CartItem>, StoreError>>()?;

        assemble_cart(row, items).map(Some)
    }

    async fn create_cart(&self, user_id: UserId) -> Result<Cart, StoreError> {
        // ON CONFLICT makes creation race-free: concurrent first adds for
        // the same user both land on the one cart the user owns.
        let row = sqlx::query_as::<_, CartRow>(&format!(
            r"
            INSERT INTO checkout.cart (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = now()
            RETURNING {CART_COLUMNS}
            "
        ))
        .bind(user_id.as_i32())
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::backend)?;

        assemble_cart(row, Vec::new())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<(), StoreError> {
        let mut tx = self.pool().begin().await.map_err(StoreError::backend)?;

        sqlx::query(
            r"
            UPDATE checkout.cart
            SET total_amount = $2, coupon_code = $3, coupon_discount = $4,
                discounted_amount = $5, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(cart.id.as_i32())
        .bind(cart.total_amount)
        .bind(cart.coupon.as_ref().map(|coupon| coupon.code.as_str()))
        .bind(cart.coupon.as_ref().map(|coupon| coupon.discount_amount))
        .bind(cart.discounted_amount)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        sqlx::query("DELETE FROM checkout.cart_item WHERE cart_id = $1")
            .bind(cart.id.as_i32())
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;

        for (index, item) in cart.items.iter().enumerate() {
            let line_no = i32::try_from(index)
                .map_err(|_| StoreError::DataCorruption("too many cart lines".to_owned()))?;
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                StoreError::DataCorruption(format!("cart item {}: quantity exceeds i32", item.id))
            })?;
            sqlx::query(
                r"
                INSERT INTO checkout.cart_item (id, cart_id, product_id, quantity, unit_price, line_no)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(item.id.as_uuid())
            .bind(cart.id.as_i32())
            .bind(item.product_id.as_i32())
            .bind(quantity)
            .bind(item.unit_price)
            .bind(line_no)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        }

        tx.commit().await.map_err(StoreError::backend)
    }
}
