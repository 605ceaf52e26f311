//! Credit ledger service
//!
//! Owns a customer's aggregate debt, the set of orders charged to credit,
//! and the recompute that keeps `debt` consistent with them. Every mutation
//! locks the credit row first so concurrent payment writes on the same
//! credit serialize instead of racing the read-modify-write recompute.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::contracts::credits::{CreditOrder, CreditResponse};
use crate::money::{clamp_non_negative, round2};
use crate::repos::{credit_repo, directory_repo, order_repo, payment_repo};
use crate::services::is_unique_violation;
use crate::services::payment_service::payment_response;

/// Errors that can occur during ledger operations
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Credit not found: {0}")]
    CreditNotFound(Uuid),

    #[error("Customer not found: {0}")]
    CustomerNotFound(Uuid),

    #[error("Customer {0} already has a credit")]
    CreditExists(Uuid),

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Order {order_id} does not belong to customer {customer_id}")]
    CrossCustomerOrder { order_id: Uuid, customer_id: Uuid },

    #[error("Order {0} is already charged to a credit")]
    OrderAlreadyCharged(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Pure debt computation:
/// `max(0, round2(total_orders) − round2(total_payments))`.
pub fn compute_debt(total_orders: Decimal, total_payments: Decimal) -> Decimal {
    clamp_non_negative(round2(round2(total_orders) - round2(total_payments)))
}

/// Recompute and persist the debt of an already-locked credit.
///
/// Callers must hold the credit row lock (`credit_repo::lock`) in the same
/// transaction; this is what serializes recomputes per credit id.
pub(crate) async fn recompute_locked(
    tx: &mut Transaction<'_, Postgres>,
    credit_id: Uuid,
) -> Result<Decimal, sqlx::Error> {
    let total_orders = credit_repo::sum_order_totals(tx, credit_id).await?;
    let total_payments = payment_repo::sum_for_credit(tx, credit_id).await?;
    let debt = compute_debt(total_orders, total_payments);
    credit_repo::set_debt(tx, credit_id, debt).await?;
    Ok(debt)
}

/// Open a credit for a customer, optionally charging initial orders to it.
pub async fn create(
    pool: &PgPool,
    customer_id: Uuid,
    order_ids: &[Uuid],
) -> LedgerResult<CreditResponse> {
    let mut tx = pool.begin().await?;

    if !directory_repo::customer_exists(&mut tx, customer_id).await? {
        return Err(LedgerError::CustomerNotFound(customer_id));
    }

    let credit_id = Uuid::new_v4();
    credit_repo::insert(&mut tx, credit_id, customer_id)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::CreditExists(customer_id)
            } else {
                LedgerError::Database(e)
            }
        })?;

    for order_id in order_ids {
        associate_one(&mut tx, credit_id, customer_id, *order_id).await?;
    }

    let debt = recompute_locked(&mut tx, credit_id).await?;
    tx.commit().await?;

    tracing::info!(
        credit_id = %credit_id,
        customer_id = %customer_id,
        orders = order_ids.len(),
        debt = %debt,
        "Credit opened"
    );

    get(pool, credit_id).await
}

/// Recompute a credit's debt from its orders and payments.
pub async fn recompute(pool: &PgPool, credit_id: Uuid) -> LedgerResult<Decimal> {
    let mut tx = pool.begin().await?;

    credit_repo::lock(&mut tx, credit_id)
        .await?
        .ok_or(LedgerError::CreditNotFound(credit_id))?;

    let debt = recompute_locked(&mut tx, credit_id).await?;
    tx.commit().await?;

    tracing::info!(credit_id = %credit_id, debt = %debt, "Credit debt recomputed");
    Ok(debt)
}

/// Charge orders to a credit, then recompute.
pub async fn associate_orders(
    pool: &PgPool,
    credit_id: Uuid,
    order_ids: &[Uuid],
) -> LedgerResult<Decimal> {
    let mut tx = pool.begin().await?;

    let credit = credit_repo::lock(&mut tx, credit_id)
        .await?
        .ok_or(LedgerError::CreditNotFound(credit_id))?;

    for order_id in order_ids {
        associate_one(&mut tx, credit_id, credit.customer_id, *order_id).await?;
    }

    let debt = recompute_locked(&mut tx, credit_id).await?;
    tx.commit().await?;

    tracing::info!(
        credit_id = %credit_id,
        orders = order_ids.len(),
        debt = %debt,
        "Orders charged to credit"
    );
    Ok(debt)
}

/// Remove an order from a credit's association set, then recompute.
pub async fn remove_order(
    pool: &PgPool,
    credit_id: Uuid,
    order_id: Uuid,
) -> LedgerResult<Decimal> {
    let mut tx = pool.begin().await?;

    credit_repo::lock(&mut tx, credit_id)
        .await?
        .ok_or(LedgerError::CreditNotFound(credit_id))?;

    let removed = credit_repo::dissociate(&mut tx, credit_id, order_id).await?;
    if removed == 0 {
        return Err(LedgerError::OrderNotFound(order_id));
    }

    let debt = recompute_locked(&mut tx, credit_id).await?;
    tx.commit().await?;

    tracing::info!(
        credit_id = %credit_id,
        order_id = %order_id,
        debt = %debt,
        "Order removed from credit"
    );
    Ok(debt)
}

/// Read a credit with its associated orders and chronological payments.
pub async fn get(pool: &PgPool, credit_id: Uuid) -> LedgerResult<CreditResponse> {
    let credit = credit_repo::find(pool, credit_id)
        .await?
        .ok_or(LedgerError::CreditNotFound(credit_id))?;

    let customer_name = directory_repo::customer_name(pool, credit.customer_id)
        .await?
        .unwrap_or_default();

    let orders = credit_repo::associated_orders(pool, credit_id)
        .await?
        .into_iter()
        .map(|o| CreditOrder {
            order_id: o.order_id,
            number: o.number,
            order_date: o.order_date,
            total: o.total,
        })
        .collect();

    let payments = payment_repo::list_for_credit(pool, credit_id)
        .await?
        .into_iter()
        .map(payment_response)
        .collect();

    Ok(CreditResponse {
        id: credit.id,
        customer_id: credit.customer_id,
        customer_name,
        debt: credit.debt,
        is_closed: credit.is_closed,
        closed_at: credit.closed_at,
        orders,
        payments,
    })
}

/// Validate and insert one order association. The order must exist, belong
/// to the credit's customer, and not already be charged to any credit.
async fn associate_one(
    tx: &mut Transaction<'_, Postgres>,
    credit_id: Uuid,
    customer_id: Uuid,
    order_id: Uuid,
) -> LedgerResult<()> {
    let order = order_repo::find_tx(tx, order_id)
        .await?
        .ok_or(LedgerError::OrderNotFound(order_id))?;

    if order.customer_id != customer_id {
        return Err(LedgerError::CrossCustomerOrder {
            order_id,
            customer_id,
        });
    }

    credit_repo::associate(tx, credit_id, order_id)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::OrderAlreadyCharged(order_id)
            } else {
                LedgerError::Database(e)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_debt_is_orders_minus_payments() {
        assert_eq!(compute_debt(dec!(100000), dec!(40000)), dec!(60000));
    }

    #[test]
    fn test_debt_is_clamped_at_zero() {
        assert_eq!(compute_debt(dec!(100), dec!(150)), Decimal::ZERO);
    }

    #[test]
    fn test_debt_rounds_both_sides_before_subtracting() {
        // 100.005 → 100.01, 50.004 → 50.00
        assert_eq!(compute_debt(dec!(100.005), dec!(50.004)), dec!(50.01));
    }

    #[test]
    fn test_debt_zero_when_exactly_paid() {
        assert_eq!(compute_debt(dec!(60000), dec!(60000)), Decimal::ZERO);
    }
}
