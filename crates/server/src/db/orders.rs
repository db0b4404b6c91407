//! Order store implementation.
//!
//! Order headers and line items are written in one transaction; the line
//! items are immutable after insertion, so updates only touch the status
//! fields.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use clementine_checkout::order::{NewOrder, Order, OrderItem, ShippingAddress};
use clementine_checkout::store::{OrderStore, StoreError};
use clementine_core::{OrderId, OrderStatus, PaymentStatus, ProductId, UserId};
use rust_decimal::Decimal;
use sqlx::types::Json;

use super::PgStore;

/// Internal row type for order header queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    total_amount: Decimal,
    discount_amount: Decimal,
    coupon_code: Option<String>,
    shipping_fee: Decimal,
    tax: Decimal,
    grand_total: Decimal,
    order_status: String,
    payment_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Internal row type for order line items.
#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: i32,
    product_id: i32,
    quantity: i32,
    unit_price: Decimal,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = StoreError;

    fn try_from(row: OrderItemRow) -> Result<Self, StoreError> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            StoreError::DataCorruption(format!("order {}: negative quantity", row.order_id))
        })?;
        Ok(Self {
            product_id: ProductId::new(row.product_id),
            quantity,
            unit_price: row.unit_price,
        })
    }
}

fn assemble_order(row: OrderRow, items: Vec<OrderItem>) -> Result<Order, StoreError> {
    let order_status = OrderStatus::from_str(&row.order_status)
        .map_err(|e| StoreError::DataCorruption(format!("order {}: {e}", row.id)))?;
    let payment_status = PaymentStatus::from_str(&row.payment_status)
        .map_err(|e| StoreError::DataCorruption(format!("order {}: {e}", row.id)))?;

    Ok(Order {
        id: OrderId::new(row.id),
        user_id: UserId::new(row.user_id),
        items,
        shipping_address: row.shipping_address.0,
        payment_method: row.payment_method,
        total_amount: row.total_amount,
        discount_amount: row.discount_amount,
        coupon_code: row.coupon_code,
        shipping_fee: row.shipping_fee,
        tax: row.tax,
        grand_total: row.grand_total,
        order_status,
        payment_status,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

const ORDER_COLUMNS: &str = r"
    id, user_id, shipping_address, payment_method, total_amount,
    discount_amount, coupon_code, shipping_fee, tax, grand_total,
    order_status, payment_status, created_at, updated_at
";

impl PgStore {
    /// Fetch line items for a set of orders, grouped by order ID.
    async fn order_items(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<OrderItem>>, StoreError> {
        let rows = sqlx::query_as::<_, OrderItemRow>(
            r"
            SELECT order_id, product_id, quantity, unit_price
            FROM checkout.order_item
            WHERE order_id = ANY($1)
            ORDER BY order_id, line_no
            ",
        )
        .bind(order_ids)
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::backend)?;

        let mut grouped: HashMap<i32, Vec<OrderItem>> = HashMap::new();
        for row in rows {
            let order_id = row.order_id;
            grouped.entry(order_id).or_default().push(row.try_into()?);
        }
        Ok(grouped)
    }

    async fn assemble_all(&self, rows: Vec<OrderRow>) -> Result<Vec<Order>, StoreError> {
        let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
        let mut items = self.order_items(&ids).await?;
        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                assemble_order(row, order_items)
            })
            .collect()
    }
}

impl OrderStore for PgStore {
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, StoreError> {
        let mut tx = self.pool().begin().await.map_err(StoreError::backend)?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            INSERT INTO checkout.orders (
                user_id, shipping_address, payment_method, total_amount,
                discount_amount, coupon_code, shipping_fee, tax, grand_total
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {ORDER_COLUMNS}
            "
        ))
        .bind(order.user_id.as_i32())
        .bind(Json(&order.shipping_address))
        .bind(&order.payment_method)
        .bind(order.total_amount)
        .bind(order.discount_amount)
        .bind(order.coupon_code.as_deref())
        .bind(order.shipping_fee)
        .bind(order.tax)
        .bind(order.grand_total)
        .fetch_one(&mut *tx)
        .await
        .map_err(StoreError::backend)?;

        for (index, item) in order.items.iter().enumerate() {
            let line_no = i32::try_from(index)
                .map_err(|_| StoreError::DataCorruption("too many order lines".to_owned()))?;
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                StoreError::DataCorruption("order line quantity exceeds i32".to_owned())
            })?;
            sqlx::query(
                r"
                INSERT INTO checkout.order_item (order_id, line_no, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(row.id)
            .bind(line_no)
            .bind(item.product_id.as_i32())
            .bind(quantity)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::backend)?;
        }

        tx.commit().await.map_err(StoreError::backend)?;

        assemble_order(row, order.items.clone())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM checkout.orders WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::backend)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items = self
            .order_items(&[row.id])
            .await?
            .remove(&row.id)
            .unwrap_or_default();

        assemble_order(row, items).map(Some)
    }

    async fn orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM checkout.orders
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::backend)?;

        self.assemble_all(rows).await
    }

    async fn all_orders(&self) -> Result<Vec<Order>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM checkout.orders
            ORDER BY created_at DESC, id DESC
            "
        ))
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::backend)?;

        self.assemble_all(rows).await
    }

    async fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r"
            UPDATE checkout.orders
            SET order_status = $2, payment_status = $3, updated_at = $4
            WHERE id = $1
            ",
        )
        .bind(order.id.as_i32())
        .bind(order.order_status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.updated_at)
        .execute(self.pool())
        .await
        .map_err(StoreError::backend)?;

        Ok(())
    }
}
