//! Field-level validation shared by the settlement services.
//!
//! These rules are pure; cross-entity checks (ownership, balances,
//! remaining quantities) live in the services where the rows are loaded.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::contracts::refunds::RefundLineRequest;

/// Validation failures reported to the caller as 400s
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Amount must be greater than zero, got {0}")]
    NonPositiveAmount(Decimal),

    #[error("Amount must not be negative, got {0}")]
    NegativeAmount(Decimal),

    #[error("Quantity must be greater than zero, got {0}")]
    NonPositiveQuantity(Decimal),

    #[error("Concept must not be empty")]
    EmptyConcept,

    #[error("Reason must not be empty")]
    EmptyReason,

    #[error("A refund must have at least one line")]
    EmptyRefund,

    #[error("Breakdown sums to {computed}, which does not match the supplied amount {declared}")]
    BreakdownMismatch { declared: Decimal, computed: Decimal },
}

/// An amount that must be strictly positive (payments, expenses)
pub fn validate_positive_amount(amount: Decimal) -> Result<(), ValidationError> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount(amount));
    }
    Ok(())
}

/// An amount that may be zero but not negative (breakdown components,
/// discounts, withholding)
pub fn validate_non_negative_amount(amount: Decimal) -> Result<(), ValidationError> {
    if amount < Decimal::ZERO {
        return Err(ValidationError::NegativeAmount(amount));
    }
    Ok(())
}

pub fn validate_concept(concept: &str) -> Result<(), ValidationError> {
    if concept.trim().is_empty() {
        return Err(ValidationError::EmptyConcept);
    }
    Ok(())
}

pub fn validate_reason(reason: &str) -> Result<(), ValidationError> {
    if reason.trim().is_empty() {
        return Err(ValidationError::EmptyReason);
    }
    Ok(())
}

/// A refund request must carry at least one line, every line a positive
/// quantity and a non-negative price override.
pub fn validate_refund_lines(lines: &[RefundLineRequest]) -> Result<(), ValidationError> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyRefund);
    }
    for line in lines {
        if line.quantity <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveQuantity(line.quantity));
        }
        if let Some(price) = line.unit_price {
            validate_non_negative_amount(price)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    #[test]
    fn test_positive_amount() {
        assert!(validate_positive_amount(dec!(0.01)).is_ok());
        assert_eq!(
            validate_positive_amount(Decimal::ZERO),
            Err(ValidationError::NonPositiveAmount(Decimal::ZERO))
        );
        assert_eq!(
            validate_positive_amount(dec!(-5)),
            Err(ValidationError::NonPositiveAmount(dec!(-5)))
        );
    }

    #[test]
    fn test_non_negative_amount() {
        assert!(validate_non_negative_amount(Decimal::ZERO).is_ok());
        assert_eq!(
            validate_non_negative_amount(dec!(-0.01)),
            Err(ValidationError::NegativeAmount(dec!(-0.01)))
        );
    }

    #[test]
    fn test_concept_and_reason_must_not_be_blank() {
        assert!(validate_concept("fuel for delivery truck").is_ok());
        assert_eq!(validate_concept("   "), Err(ValidationError::EmptyConcept));
        assert_eq!(validate_reason(""), Err(ValidationError::EmptyReason));
    }

    #[test]
    fn test_refund_lines_must_not_be_empty() {
        assert_eq!(
            validate_refund_lines(&[]),
            Err(ValidationError::EmptyRefund)
        );
    }

    #[test]
    fn test_refund_line_quantity_must_be_positive() {
        let lines = vec![RefundLineRequest {
            item_id: Uuid::new_v4(),
            quantity: Decimal::ZERO,
            unit_price: None,
        }];
        assert_eq!(
            validate_refund_lines(&lines),
            Err(ValidationError::NonPositiveQuantity(Decimal::ZERO))
        );
    }

    #[test]
    fn test_refund_line_price_override_must_not_be_negative() {
        let lines = vec![RefundLineRequest {
            item_id: Uuid::new_v4(),
            quantity: dec!(2),
            unit_price: Some(dec!(-10)),
        }];
        assert_eq!(
            validate_refund_lines(&lines),
            Err(ValidationError::NegativeAmount(dec!(-10)))
        );
    }
}
