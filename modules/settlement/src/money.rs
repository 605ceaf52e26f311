//! Monetary normalization
//!
//! Every amount that enters the settlement core passes through `round2`
//! before it is persisted or compared. Repeated additions and subtractions
//! of 2-dp values stay exact under `Decimal`; the rounding here guards the
//! boundary where client-supplied values arrive with more precision.

use rust_decimal::{Decimal, RoundingStrategy};

/// All monetary values carry exactly 2 decimal places.
pub const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01).
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Round a monetary value to 2 decimal places, half away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// Whether two amounts are equal within the 0.01 money tolerance.
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= MONEY_TOLERANCE
}

/// Sum an iterator of amounts and normalize the result.
pub fn sum2<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    round2(values.into_iter().sum())
}

/// Clamp a balance at zero: aggregate debts never go negative.
pub fn clamp_non_negative(value: Decimal) -> Decimal {
    if value.is_sign_negative() {
        Decimal::ZERO
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round2_half_away_from_zero() {
        assert_eq!(round2(dec!(1.005)), dec!(1.01));
        assert_eq!(round2(dec!(1.004)), dec!(1.00));
        assert_eq!(round2(dec!(-1.005)), dec!(-1.01));
    }

    #[test]
    fn test_round2_is_stable_on_two_dp_values() {
        assert_eq!(round2(dec!(1234.56)), dec!(1234.56));
        assert_eq!(round2(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_within_tolerance_boundary() {
        assert!(within_tolerance(dec!(100.00), dec!(100.01)));
        assert!(within_tolerance(dec!(100.01), dec!(100.00)));
        assert!(!within_tolerance(dec!(100.00), dec!(100.02)));
    }

    #[test]
    fn test_sum2_normalizes_accumulated_drift() {
        let values = vec![dec!(0.105), dec!(0.105), dec!(0.105)];
        assert_eq!(sum2(values), dec!(0.32));
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(clamp_non_negative(dec!(-0.01)), Decimal::ZERO);
        assert_eq!(clamp_non_negative(dec!(0.01)), dec!(0.01));
        assert_eq!(clamp_non_negative(Decimal::ZERO), Decimal::ZERO);
    }
}
