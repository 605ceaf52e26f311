use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use settlement_rs::contracts::deliveries::DeliveryStatus;
use settlement_rs::services::settlement_service::{
    reconcile_amount, resolve_declared_amount, MethodBreakdown,
};
use settlement_rs::validation::ValidationError;

fn all_cash(amount: Decimal) -> MethodBreakdown {
    MethodBreakdown {
        cash: amount,
        ..Default::default()
    }
}

#[test]
fn test_amount_computed_from_breakdown_when_absent() {
    let breakdown = MethodBreakdown {
        cash: dec!(100000),
        transfer: dec!(30000),
        check: dec!(15000),
        deposit: dec!(5000),
    };
    assert_eq!(resolve_declared_amount(&breakdown, None), Ok(dec!(150000)));
}

#[test]
fn test_supplied_amount_validated_against_breakdown() {
    let breakdown = all_cash(dec!(150000));

    // Exact match and within-tolerance match both pass
    assert_eq!(
        resolve_declared_amount(&breakdown, Some(dec!(150000))),
        Ok(dec!(150000))
    );
    assert_eq!(
        resolve_declared_amount(&breakdown, Some(dec!(150000.01))),
        Ok(dec!(150000.01))
    );

    // Beyond 0.01 is a validation error, not a silent correction
    assert_eq!(
        resolve_declared_amount(&breakdown, Some(dec!(149999.98))),
        Err(ValidationError::BreakdownMismatch {
            declared: dec!(149999.98),
            computed: dec!(150000),
        })
    );
}

#[test]
fn test_supplied_amount_stands_when_no_breakdown_given() {
    let breakdown = MethodBreakdown::default();
    assert_eq!(
        resolve_declared_amount(&breakdown, Some(dec!(150000))),
        Ok(dec!(150000))
    );
}

#[test]
fn test_confirm_reconciles_amount_to_breakdown() {
    // Stored amount matches the breakdown sum within tolerance: no change
    assert_eq!(reconcile_amount(dec!(150000), dec!(150000.01)), None);

    // Diverging amount is corrected to the breakdown sum
    assert_eq!(
        reconcile_amount(dec!(150000), dec!(148000)),
        Some(dec!(148000))
    );
}

#[test]
fn test_breakdown_sum_normalizes_components() {
    let breakdown = MethodBreakdown {
        cash: dec!(0.105),
        transfer: dec!(0.105),
        check: Decimal::ZERO,
        deposit: Decimal::ZERO,
    };
    assert_eq!(breakdown.sum(), dec!(0.21));
}

#[test]
fn test_delivery_lifecycle_transitions() {
    // PENDING → DELIVERED → VERIFIED is the happy path
    assert!(DeliveryStatus::Pending.can_transition(DeliveryStatus::Delivered));
    assert!(DeliveryStatus::Delivered.can_transition(DeliveryStatus::Verified));

    // PENDING → REJECTED is the cancellation path
    assert!(DeliveryStatus::Pending.can_transition(DeliveryStatus::Rejected));

    // A delivered batch can no longer be rejected, and nothing leaves the
    // terminal states
    assert!(!DeliveryStatus::Delivered.can_transition(DeliveryStatus::Rejected));
    assert!(!DeliveryStatus::Verified.can_transition(DeliveryStatus::Delivered));
    assert!(!DeliveryStatus::Rejected.can_transition(DeliveryStatus::Pending));
}
