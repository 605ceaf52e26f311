//! Repository for payments (abonos) applied against customer credits.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Payment row
#[derive(Debug, Clone, FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub credit_id: Uuid,
    pub location_id: Uuid,
    pub collector_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub order_number: Option<String>,
    pub paid_on: NaiveDate,
    pub method: Option<String>,
    pub cash_amount: Decimal,
    pub transfer_amount: Decimal,
    pub check_amount: Decimal,
    pub withholding_amount: Decimal,
    pub amount: Decimal,
    pub balance_after: Decimal,
    pub receipt_ref: Option<String>,
    pub is_settled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payment joined with the owning customer's name, for line snapshots
#[derive(Debug, Clone, FromRow)]
pub struct PaymentWithCustomer {
    pub id: Uuid,
    pub credit_id: Uuid,
    pub paid_on: NaiveDate,
    pub order_number: Option<String>,
    pub withholding_amount: Decimal,
    pub amount: Decimal,
    pub is_settled: bool,
    pub customer_name: String,
}

/// Unsettled payment in a branch/date window
#[derive(Debug, Clone, FromRow)]
pub struct SettleablePaymentRow {
    pub id: Uuid,
    pub paid_on: NaiveDate,
    pub amount: Decimal,
    pub withholding_amount: Decimal,
    pub order_number: Option<String>,
    pub customer_name: String,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    payment: &Payment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO payments
            (id, credit_id, location_id, collector_id, order_id, order_number,
             paid_on, method, cash_amount, transfer_amount, check_amount,
             withholding_amount, amount, balance_after, receipt_ref, is_settled)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        "#,
    )
    .bind(payment.id)
    .bind(payment.credit_id)
    .bind(payment.location_id)
    .bind(payment.collector_id)
    .bind(payment.order_id)
    .bind(&payment.order_number)
    .bind(payment.paid_on)
    .bind(&payment.method)
    .bind(payment.cash_amount)
    .bind(payment.transfer_amount)
    .bind(payment.check_amount)
    .bind(payment.withholding_amount)
    .bind(payment.amount)
    .bind(payment.balance_after)
    .bind(&payment.receipt_ref)
    .bind(payment.is_settled)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn find_tx(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, credit_id, location_id, collector_id, order_id, order_number,
               paid_on, method, cash_amount, transfer_amount, check_amount,
               withholding_amount, amount, balance_after, receipt_ref,
               is_settled, created_at, updated_at
        FROM payments
        WHERE id = $1
        "#,
    )
    .bind(payment_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn find(pool: &PgPool, payment_id: Uuid) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, credit_id, location_id, collector_id, order_id, order_number,
               paid_on, method, cash_amount, transfer_amount, check_amount,
               withholding_amount, amount, balance_after, receipt_ref,
               is_settled, created_at, updated_at
        FROM payments
        WHERE id = $1
        "#,
    )
    .bind(payment_id)
    .fetch_optional(pool)
    .await
}

/// Chronological (append-order) payment list for a credit
pub async fn list_for_credit(
    pool: &PgPool,
    credit_id: Uuid,
) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        r#"
        SELECT id, credit_id, location_id, collector_id, order_id, order_number,
               paid_on, method, cash_amount, transfer_amount, check_amount,
               withholding_amount, amount, balance_after, receipt_ref,
               is_settled, created_at, updated_at
        FROM payments
        WHERE credit_id = $1
        ORDER BY paid_on, created_at
        "#,
    )
    .bind(credit_id)
    .fetch_all(pool)
    .await
}

/// Sum of all payment amounts recorded against a credit
pub async fn sum_for_credit(
    tx: &mut Transaction<'_, Postgres>,
    credit_id: Uuid,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar::<_, Decimal>(
        "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE credit_id = $1",
    )
    .bind(credit_id)
    .fetch_one(&mut **tx)
    .await
}

/// Full-row update of an edited payment
pub async fn update(
    tx: &mut Transaction<'_, Postgres>,
    payment: &Payment,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE payments
        SET order_id = $2, order_number = $3, paid_on = $4, method = $5,
            cash_amount = $6, transfer_amount = $7, check_amount = $8,
            withholding_amount = $9, amount = $10, balance_after = $11,
            receipt_ref = $12, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(payment.id)
    .bind(payment.order_id)
    .bind(&payment.order_number)
    .bind(payment.paid_on)
    .bind(&payment.method)
    .bind(payment.cash_amount)
    .bind(payment.transfer_amount)
    .bind(payment.check_amount)
    .bind(payment.withholding_amount)
    .bind(payment.amount)
    .bind(payment.balance_after)
    .bind(&payment.receipt_ref)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Rewrite a payment's balance snapshot after an explicit recompute
pub async fn set_balance_after(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
    balance_after: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE payments SET balance_after = $2, updated_at = NOW() WHERE id = $1")
        .bind(payment_id)
        .bind(balance_after)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn delete(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM payments WHERE id = $1")
        .bind(payment_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Claim the settled flag: succeeds at most once per payment.
pub async fn claim_settled(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE payments SET is_settled = TRUE, updated_at = NOW() \
         WHERE id = $1 AND is_settled = FALSE",
    )
    .bind(payment_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Release the settled flag (rejected or deleted delivery)
pub async fn release_settled(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE payments SET is_settled = FALSE, updated_at = NOW() WHERE id = $1",
    )
    .bind(payment_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Payment with its customer name, for delivery line snapshotting
pub async fn find_with_customer_tx(
    tx: &mut Transaction<'_, Postgres>,
    payment_id: Uuid,
) -> Result<Option<PaymentWithCustomer>, sqlx::Error> {
    sqlx::query_as::<_, PaymentWithCustomer>(
        r#"
        SELECT p.id, p.credit_id, p.paid_on, p.order_number,
               p.withholding_amount, p.amount, p.is_settled,
               cu.name AS customer_name
        FROM payments p
        INNER JOIN credits c ON c.id = p.credit_id
        INNER JOIN customers cu ON cu.id = c.customer_id
        WHERE p.id = $1
        "#,
    )
    .bind(payment_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Unsettled payments collected at a branch within a date window
pub async fn list_unsettled(
    pool: &PgPool,
    location_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<SettleablePaymentRow>, sqlx::Error> {
    sqlx::query_as::<_, SettleablePaymentRow>(
        r#"
        SELECT p.id, p.paid_on, p.amount, p.withholding_amount, p.order_number,
               cu.name AS customer_name
        FROM payments p
        INNER JOIN credits c ON c.id = p.credit_id
        INNER JOIN customers cu ON cu.id = c.customer_id
        WHERE p.location_id = $1
          AND p.is_settled = FALSE
          AND p.paid_on >= $2
          AND p.paid_on <= $3
        ORDER BY p.paid_on, p.created_at
        "#,
    )
    .bind(location_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}
