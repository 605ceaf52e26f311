//! Repository for cash deliveries and their frozen line snapshots.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Cash delivery row
#[derive(Debug, Clone, FromRow)]
pub struct CashDelivery {
    pub id: Uuid,
    pub location_id: Uuid,
    pub employee_id: Uuid,
    pub delivery_date: NaiveDate,
    pub cash_amount: Decimal,
    pub transfer_amount: Decimal,
    pub check_amount: Decimal,
    pub deposit_amount: Decimal,
    pub amount: Decimal,
    pub withholding_total: Decimal,
    pub modality: Option<String>,
    pub status: String,
    pub declared_amount: Option<Decimal>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Frozen snapshot of one settled order or payment
#[derive(Debug, Clone, FromRow)]
pub struct DeliveryLine {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub source_kind: String,
    pub source_id: Uuid,
    pub amount: Decimal,
    pub order_number: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub credit_sale: bool,
    pub customer_name: Option<String>,
    pub released: bool,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    delivery: &CashDelivery,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO cash_deliveries
            (id, location_id, employee_id, delivery_date, cash_amount,
             transfer_amount, check_amount, deposit_amount, amount,
             withholding_total, modality, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(delivery.id)
    .bind(delivery.location_id)
    .bind(delivery.employee_id)
    .bind(delivery.delivery_date)
    .bind(delivery.cash_amount)
    .bind(delivery.transfer_amount)
    .bind(delivery.check_amount)
    .bind(delivery.deposit_amount)
    .bind(delivery.amount)
    .bind(delivery.withholding_total)
    .bind(&delivery.modality)
    .bind(&delivery.status)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn find(pool: &PgPool, delivery_id: Uuid) -> Result<Option<CashDelivery>, sqlx::Error> {
    sqlx::query_as::<_, CashDelivery>(
        r#"
        SELECT id, location_id, employee_id, delivery_date, cash_amount,
               transfer_amount, check_amount, deposit_amount, amount,
               withholding_total, modality, status, declared_amount,
               rejection_reason, created_at, updated_at
        FROM cash_deliveries
        WHERE id = $1
        "#,
    )
    .bind(delivery_id)
    .fetch_optional(pool)
    .await
}

/// Lock a delivery row for a state transition
pub async fn lock(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: Uuid,
) -> Result<Option<CashDelivery>, sqlx::Error> {
    sqlx::query_as::<_, CashDelivery>(
        r#"
        SELECT id, location_id, employee_id, delivery_date, cash_amount,
               transfer_amount, check_amount, deposit_amount, amount,
               withholding_total, modality, status, declared_amount,
               rejection_reason, created_at, updated_at
        FROM cash_deliveries
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(delivery_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn exists_tx(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS (SELECT 1 FROM cash_deliveries WHERE id = $1)",
    )
    .bind(delivery_id)
    .fetch_one(&mut **tx)
    .await
}

/// Whether a live (non-rejected) batch already exists for the triple
pub async fn active_batch_exists(
    tx: &mut Transaction<'_, Postgres>,
    location_id: Uuid,
    employee_id: Uuid,
    delivery_date: NaiveDate,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM cash_deliveries
            WHERE location_id = $1
              AND employee_id = $2
              AND delivery_date = $3
              AND status <> 'REJECTED'
        )
        "#,
    )
    .bind(location_id)
    .bind(employee_id)
    .bind(delivery_date)
    .fetch_one(&mut **tx)
    .await
}

/// Rewrite the breakdown, aggregate amount and withholding after lines are
/// attached (the lines are authoritative).
pub async fn update_totals(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: Uuid,
    cash_amount: Decimal,
    transfer_amount: Decimal,
    check_amount: Decimal,
    deposit_amount: Decimal,
    amount: Decimal,
    withholding_total: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE cash_deliveries
        SET cash_amount = $2, transfer_amount = $3, check_amount = $4,
            deposit_amount = $5, amount = $6, withholding_total = $7,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(delivery_id)
    .bind(cash_amount)
    .bind(transfer_amount)
    .bind(check_amount)
    .bind(deposit_amount)
    .bind(amount)
    .bind(withholding_total)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn set_delivered(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: Uuid,
    amount: Decimal,
    declared_amount: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE cash_deliveries
        SET status = 'DELIVERED', amount = $2, declared_amount = $3,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(delivery_id)
    .bind(amount)
    .bind(declared_amount)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn set_rejected(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: Uuid,
    reason: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE cash_deliveries
        SET status = 'REJECTED', rejection_reason = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(delivery_id)
    .bind(reason)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn set_verified(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE cash_deliveries SET status = 'VERIFIED', updated_at = NOW() WHERE id = $1",
    )
    .bind(delivery_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn delete(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM cash_deliveries WHERE id = $1")
        .bind(delivery_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn insert_line(
    tx: &mut Transaction<'_, Postgres>,
    line: &DeliveryLine,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO delivery_lines
            (id, delivery_id, source_kind, source_id, amount, order_number,
             order_date, credit_sale, customer_name)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(line.id)
    .bind(line.delivery_id)
    .bind(&line.source_kind)
    .bind(line.source_id)
    .bind(line.amount)
    .bind(&line.order_number)
    .bind(line.order_date)
    .bind(line.credit_sale)
    .bind(&line.customer_name)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn lines(
    pool: &PgPool,
    delivery_id: Uuid,
) -> Result<Vec<DeliveryLine>, sqlx::Error> {
    sqlx::query_as::<_, DeliveryLine>(
        r#"
        SELECT id, delivery_id, source_kind, source_id, amount, order_number,
               order_date, credit_sale, customer_name, released
        FROM delivery_lines
        WHERE delivery_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(delivery_id)
    .fetch_all(pool)
    .await
}

pub async fn lines_tx(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: Uuid,
) -> Result<Vec<DeliveryLine>, sqlx::Error> {
    sqlx::query_as::<_, DeliveryLine>(
        r#"
        SELECT id, delivery_id, source_kind, source_id, amount, order_number,
               order_date, credit_sale, customer_name, released
        FROM delivery_lines
        WHERE delivery_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(delivery_id)
    .fetch_all(&mut **tx)
    .await
}

/// Mark all of a delivery's lines as released. The snapshot rows stay for
/// audit; the partial unique index stops excluding their sources.
pub async fn release_lines(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE delivery_lines SET released = TRUE WHERE delivery_id = $1")
        .bind(delivery_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn delete_lines(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM delivery_lines WHERE delivery_id = $1")
        .bind(delivery_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Deliveries filtered by optional branch/employee and date window
pub async fn list(
    pool: &PgPool,
    location_id: Option<Uuid>,
    employee_id: Option<Uuid>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<CashDelivery>, sqlx::Error> {
    sqlx::query_as::<_, CashDelivery>(
        r#"
        SELECT id, location_id, employee_id, delivery_date, cash_amount,
               transfer_amount, check_amount, deposit_amount, amount,
               withholding_total, modality, status, declared_amount,
               rejection_reason, created_at, updated_at
        FROM cash_deliveries
        WHERE ($1::UUID IS NULL OR location_id = $1)
          AND ($2::UUID IS NULL OR employee_id = $2)
          AND ($3::DATE IS NULL OR delivery_date >= $3)
          AND ($4::DATE IS NULL OR delivery_date <= $4)
        ORDER BY delivery_date DESC, created_at DESC
        "#,
    )
    .bind(location_id)
    .bind(employee_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}
