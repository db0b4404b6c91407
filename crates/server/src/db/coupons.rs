//! Coupon store implementation.

use chrono::{DateTime, Utc};
use clementine_checkout::coupon::{Coupon, NewCoupon};
use clementine_checkout::store::{CouponStore, StoreError};
use clementine_core::{CouponId, DiscountType};
use rust_decimal::Decimal;

use super::PgStore;

/// Internal row type for coupon queries.
#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: i32,
    code: String,
    description: String,
    discount_type: String,
    discount_amount: Decimal,
    min_purchase: Decimal,
    max_discount: Option<Decimal>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    is_active: bool,
    usage_limit: Option<i32>,
    usage_count: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = StoreError;

    fn try_from(row: CouponRow) -> Result<Self, StoreError> {
        let discount_type = row.discount_type.parse::<DiscountType>().map_err(|e| {
            StoreError::DataCorruption(format!("coupon {}: {e}", row.id))
        })?;

        Ok(Self {
            id: CouponId::new(row.id),
            code: row.code,
            description: row.description,
            discount_type,
            discount_amount: row.discount_amount,
            min_purchase: row.min_purchase,
            max_discount: row.max_discount,
            start_date: row.start_date,
            end_date: row.end_date,
            is_active: row.is_active,
            usage_limit: row.usage_limit,
            usage_count: row.usage_count,
            created_at: row.created_at,
        })
    }
}

const COUPON_COLUMNS: &str = r"
    id, code, description, discount_type, discount_amount, min_purchase,
    max_discount, start_date, end_date, is_active, usage_limit, usage_count,
    created_at
";

impl CouponStore for PgStore {
    async fn coupon_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM checkout.coupon WHERE lower(code) = lower($1)"
        ))
        .bind(code)
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::backend)?;

        row.map(TryInto::try_into).transpose()
    }

    async fn coupon(&self, id: CouponId) -> Result<Option<Coupon>, StoreError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM checkout.coupon WHERE id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(self.pool())
        .await
        .map_err(StoreError::backend)?;

        row.map(TryInto::try_into).transpose()
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>, StoreError> {
        let rows = sqlx::query_as::<_, CouponRow>(&format!(
            "SELECT {COUPON_COLUMNS} FROM checkout.coupon ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(self.pool())
        .await
        .map_err(StoreError::backend)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn insert_coupon(&self, coupon: &NewCoupon) -> Result<Coupon, StoreError> {
        let row = sqlx::query_as::<_, CouponRow>(&format!(
            r"
            INSERT INTO checkout.coupon (
                code, description, discount_type, discount_amount,
                min_purchase, max_discount, start_date, end_date,
                is_active, usage_limit
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {COUPON_COLUMNS}
            "
        ))
        .bind(&coupon.code)
        .bind(&coupon.description)
        .bind(coupon.discount_type.as_str())
        .bind(coupon.discount_amount)
        .bind(coupon.min_purchase)
        .bind(coupon.max_discount)
        .bind(coupon.start_date)
        .bind(coupon.end_date)
        .bind(coupon.is_active)
        .bind(coupon.usage_limit)
        .fetch_one(self.pool())
        .await
        .map_err(StoreError::backend)?;

        row.try_into()
    }

    async fn update_coupon(&self, coupon: &Coupon) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE checkout.coupon
            SET code = $2, description = $3, discount_type = $4,
                discount_amount = $5, min_purchase = $6, max_discount = $7,
                start_date = $8, end_date = $9, is_active = $10,
                usage_limit = $11
            WHERE id = $1
            ",
        )
        .bind(coupon.id.as_i32())
        .bind(&coupon.code)
        .bind(&coupon.description)
        .bind(coupon.discount_type.as_str())
        .bind(coupon.discount_amount)
        .bind(coupon.min_purchase)
        .bind(coupon.max_discount)
        .bind(coupon.start_date)
        .bind(coupon.end_date)
        .bind(coupon.is_active)
        .bind(coupon.usage_limit)
        .execute(self.pool())
        .await
        .map_err(StoreError::backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_coupon(&self, id: CouponId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM checkout.coupon WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool())
            .await
            .map_err(StoreError::backend)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_usage(&self, id: CouponId) -> Result<(), StoreError> {
        sqlx::query("UPDATE checkout.coupon SET usage_count = usage_count + 1 WHERE id = $1")
            .bind(id.as_i32())
            .execute(self.pool())
            .await
            .map_err(StoreError::backend)?;

        Ok(())
    }
}
