//! Money arithmetic helpers over decimal values.
//!
//! All monetary amounts in Clementine are `rust_decimal::Decimal` in the
//! currency's standard unit (dollars, not cents). Derived amounts (discounts,
//! totals) are rounded to two decimal places at the point where they are
//! computed, so persisted values never accumulate sub-cent residue.

use rust_decimal::Decimal;

/// Number of decimal places kept for monetary amounts.
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to the money scale (banker's rounding).
#[must_use]
pub fn round(amount: Decimal) -> Decimal {
    amount.round_dp(MONEY_SCALE)
}

/// Clamp a computed amount at zero.
///
/// Discounts and fees can push an intermediate value negative; monetary
/// results are never negative.
#[must_use]
pub fn clamp_non_negative(amount: Decimal) -> Decimal {
    amount.max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to_cents() {
        // 10.005 rounds to even (banker's rounding)
        assert_eq!(round(Decimal::new(10_005, 3)), Decimal::new(1000, 2));
        assert_eq!(round(Decimal::new(10_015, 3)), Decimal::new(1002, 2));
        assert_eq!(round(Decimal::new(19_999, 3)), Decimal::new(2000, 2));
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(clamp_non_negative(Decimal::new(-350, 2)), Decimal::ZERO);
        assert_eq!(clamp_non_negative(Decimal::new(350, 2)), Decimal::new(350, 2));
    }
}
