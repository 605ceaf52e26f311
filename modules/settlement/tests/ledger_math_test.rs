use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use settlement_rs::money::round2;
use settlement_rs::services::ledger_service::compute_debt;

#[test]
fn test_payment_reduces_debt() {
    // Credit debt 100,000; payment of 40,000 leaves 60,000
    let debt = compute_debt(dec!(100000), dec!(40000));
    assert_eq!(debt, dec!(60000));

    // The payment's snapshot is the debt immediately after application
    let balance_after = round2(dec!(100000) - dec!(40000));
    assert_eq!(balance_after, dec!(60000));
}

#[test]
fn test_exact_payoff_reaches_zero() {
    // 40,000 then 60,000 against 100,000 of orders
    let debt = compute_debt(dec!(100000), dec!(40000) + dec!(60000));
    assert_eq!(debt, Decimal::ZERO);
}

#[test]
fn test_overpayment_would_be_visible_before_the_check() {
    // The recorder rejects any amount above the current debt; the ledger
    // itself clamps, so even a bad write cannot drive the debt negative.
    let debt = compute_debt(dec!(60000), dec!(70000));
    assert_eq!(debt, Decimal::ZERO);
}

#[test]
fn test_debt_sums_many_orders_and_payments() {
    let orders = [dec!(1250.40), dec!(3780.10), dec!(990.50)];
    let payments = [dec!(1000.00), dec!(2000.99)];
    let debt = compute_debt(orders.iter().copied().sum(), payments.iter().copied().sum());
    assert_eq!(debt, dec!(3020.01));
}

#[test]
fn test_debt_normalizes_sub_cent_inputs() {
    // Client-supplied values with more than 2 decimals round before the
    // subtraction, so repeated recomputes cannot drift
    let debt = compute_debt(dec!(10.999), dec!(0.001));
    assert_eq!(debt, dec!(11.00));
}

#[test]
fn test_recompute_is_idempotent_on_two_dp_values() {
    let first = compute_debt(dec!(5432.10), dec!(432.10));
    let second = compute_debt(first + dec!(432.10), dec!(432.10));
    assert_eq!(first, dec!(5000.00));
    assert_eq!(second, dec!(5000.00));
}
