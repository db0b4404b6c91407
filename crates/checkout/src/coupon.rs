//! Coupon records and the discount evaluator.
//!
//! The evaluator is pure: validity and discount amount are functions of the
//! coupon, the order amount, and a caller-supplied `now`. Nothing here
//! mutates the coupon record - usage counting happens once, at
//! order-creation time, in the order service.

use chrono::{DateTime, Utc};
use clementine_core::{CouponId, DiscountType, types::money};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};

/// A coupon as read from the coupon store.
///
/// Codes are canonically uppercase and matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    /// Percentage points for [`DiscountType::Percentage`], a flat amount
    /// for [`DiscountType::Fixed`].
    pub discount_amount: Decimal,
    /// Minimum order amount the coupon applies to.
    pub min_purchase: Decimal,
    /// Cap on the computed discount (percentage coupons only).
    pub max_discount: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    /// Total number of redemptions allowed; `None` means unlimited.
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    /// Whether the coupon can be used against an order of `order_amount`.
    ///
    /// True iff the coupon is active, `now` falls within
    /// `[start_date, end_date]`, the usage limit (when set) is not
    /// exhausted, and the order meets the minimum purchase.
    #[must_use]
    pub fn is_valid(&self, order_amount: Decimal, now: DateTime<Utc>) -> bool {
        if !self.is_active || now < self.start_date || now > self.end_date {
            return false;
        }

        if let Some(limit) = self.usage_limit
            && self.usage_count >= limit
        {
            return false;
        }

        order_amount >= self.min_purchase
    }

    /// The discount this coupon grants against `order_amount`.
    ///
    /// Returns zero when the coupon is not valid for the amount. The result
    /// is always within `[0, order_amount]`: percentage discounts are
    /// rounded to cents and capped at `max_discount` when set, fixed
    /// discounts never exceed the order amount.
    #[must_use]
    pub fn discount_for(&self, order_amount: Decimal, now: DateTime<Utc>) -> Decimal {
        if !self.is_valid(order_amount, now) {
            return Decimal::ZERO;
        }

        let discount = match self.discount_type {
            DiscountType::Percentage => {
                let raw = money::round(order_amount * self.discount_amount / Decimal::ONE_HUNDRED);
                match self.max_discount {
                    Some(cap) => raw.min(cap),
                    None => raw,
                }
            }
            DiscountType::Fixed => self.discount_amount,
        };

        money::clamp_non_negative(discount.min(order_amount))
    }
}

/// Input for creating a coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_amount: Decimal,
    #[serde(default)]
    pub min_purchase: Decimal,
    pub max_discount: Option<Decimal>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub usage_limit: Option<i32>,
}

const fn default_true() -> bool {
    true
}

impl NewCoupon {
    /// Validate the input and return it with a canonical (uppercase,
    /// trimmed) code.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidState` when the code is empty, the
    /// discount amount is out of range for its type, a monetary field is
    /// negative, or the validity window is inverted.
    pub fn into_canonical(mut self) -> Result<Self> {
        self.code = self.code.trim().to_uppercase();
        validate_fields(
            &self.code,
            self.discount_type,
            self.discount_amount,
            self.min_purchase,
            self.max_discount,
            self.start_date,
            self.end_date,
        )?;
        Ok(self)
    }
}

/// Partial update to a coupon; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CouponUpdate {
    pub code: Option<String>,
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_amount: Option<Decimal>,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub usage_limit: Option<i32>,
}

impl Coupon {
    /// Merge a partial update into the coupon, re-validating the result.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::InvalidState` when the merged coupon would
    /// violate the same rules as [`NewCoupon::into_canonical`].
    pub fn apply_update(&mut self, update: CouponUpdate) -> Result<()> {
        if let Some(code) = update.code {
            self.code = code.trim().to_uppercase();
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(discount_type) = update.discount_type {
            self.discount_type = discount_type;
        }
        if let Some(discount_amount) = update.discount_amount {
            self.discount_amount = discount_amount;
        }
        if let Some(min_purchase) = update.min_purchase {
            self.min_purchase = min_purchase;
        }
        if let Some(max_discount) = update.max_discount {
            self.max_discount = Some(max_discount);
        }
        if let Some(start_date) = update.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            self.end_date = end_date;
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
        if let Some(usage_limit) = update.usage_limit {
            self.usage_limit = Some(usage_limit);
        }

        validate_fields(
            &self.code,
            self.discount_type,
            self.discount_amount,
            self.min_purchase,
            self.max_discount,
            self.start_date,
            self.end_date,
        )
    }
}

fn validate_fields(
    code: &str,
    discount_type: DiscountType,
    discount_amount: Decimal,
    min_purchase: Decimal,
    max_discount: Option<Decimal>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Result<()> {
    if code.is_empty() {
        return Err(CheckoutError::InvalidState(
            "coupon code must not be empty".to_owned(),
        ));
    }
    if discount_amount <= Decimal::ZERO {
        return Err(CheckoutError::InvalidState(
            "discount amount must be positive".to_owned(),
        ));
    }
    if discount_type == DiscountType::Percentage && discount_amount > Decimal::ONE_HUNDRED {
        return Err(CheckoutError::InvalidState(
            "percentage discount cannot exceed 100".to_owned(),
        ));
    }
    if min_purchase < Decimal::ZERO || max_discount.is_some_and(|cap| cap < Decimal::ZERO) {
        return Err(CheckoutError::InvalidState(
            "monetary amounts must not be negative".to_owned(),
        ));
    }
    if end_date < start_date {
        return Err(CheckoutError::InvalidState(
            "end date must not precede start date".to_owned(),
        ));
    }
    Ok(())
}
