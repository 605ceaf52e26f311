use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use settlement_rs::services::refund_service::{
    line_subtotal, refund_total, remaining_refundable,
};

#[test]
fn test_refund_exhaustion_scenario() {
    // Item originally sold as 5 units; a processed refund took 2
    let remaining = remaining_refundable(dec!(5), dec!(2));
    assert_eq!(remaining, dec!(3));

    // A second refund for 4 units must be rejected (2 + 4 > 5)
    assert!(dec!(4) > remaining);

    // A second refund for 3 units exactly exhausts the line (2 + 3 = 5)
    assert!(dec!(3) <= remaining);
    assert_eq!(remaining_refundable(dec!(5), dec!(2) + dec!(3)), Decimal::ZERO);
}

#[test]
fn test_nothing_refundable_on_fully_refunded_line() {
    assert_eq!(remaining_refundable(dec!(5), dec!(5)), Decimal::ZERO);
}

#[test]
fn test_fractional_quantities_are_supported() {
    // Glass is sold by the square meter; refunds follow suit
    let remaining = remaining_refundable(dec!(12.50), dec!(4.25));
    assert_eq!(remaining, dec!(8.25));
}

#[test]
fn test_line_subtotal_uses_original_unit_price() {
    assert_eq!(line_subtotal(dec!(2), dec!(19250.00)), dec!(38500.00));
    assert_eq!(line_subtotal(dec!(1.5), dec!(333.33)), dec!(500.00));
}

#[test]
fn test_total_applies_discount_and_floors_at_zero() {
    assert_eq!(refund_total(dec!(38500.00), dec!(500.00)), dec!(38000.00));
    assert_eq!(refund_total(dec!(100.00), Decimal::ZERO), dec!(100.00));
    assert_eq!(refund_total(dec!(100.00), dec!(250.00)), Decimal::ZERO);
}
