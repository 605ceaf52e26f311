//! Repository for branch expenses.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Expense row
#[derive(Debug, Clone, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub location_id: Uuid,
    pub delivery_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub spent_on: NaiveDate,
    pub amount: Decimal,
    pub concept: String,
    pub category: String,
    pub approved: bool,
    pub receipt_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    expense: &Expense,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO expenses
            (id, location_id, delivery_id, employee_id, supplier_id, spent_on,
             amount, concept, category, approved, receipt_ref)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(expense.id)
    .bind(expense.location_id)
    .bind(expense.delivery_id)
    .bind(expense.employee_id)
    .bind(expense.supplier_id)
    .bind(expense.spent_on)
    .bind(expense.amount)
    .bind(&expense.concept)
    .bind(&expense.category)
    .bind(expense.approved)
    .bind(&expense.receipt_ref)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn find(pool: &PgPool, expense_id: Uuid) -> Result<Option<Expense>, sqlx::Error> {
    sqlx::query_as::<_, Expense>(
        r#"
        SELECT id, location_id, delivery_id, employee_id, supplier_id, spent_on,
               amount, concept, category, approved, receipt_ref, created_at
        FROM expenses
        WHERE id = $1
        "#,
    )
    .bind(expense_id)
    .fetch_optional(pool)
    .await
}

pub async fn find_tx(
    tx: &mut Transaction<'_, Postgres>,
    expense_id: Uuid,
) -> Result<Option<Expense>, sqlx::Error> {
    sqlx::query_as::<_, Expense>(
        r#"
        SELECT id, location_id, delivery_id, employee_id, supplier_id, spent_on,
               amount, concept, category, approved, receipt_ref, created_at
        FROM expenses
        WHERE id = $1
        "#,
    )
    .bind(expense_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Full-row update of the editable fields
pub async fn update(
    tx: &mut Transaction<'_, Postgres>,
    expense: &Expense,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE expenses
        SET amount = $2, concept = $3, category = $4, spent_on = $5,
            delivery_id = $6, receipt_ref = $7
        WHERE id = $1
        "#,
    )
    .bind(expense.id)
    .bind(expense.amount)
    .bind(&expense.concept)
    .bind(&expense.category)
    .bind(expense.spent_on)
    .bind(expense.delivery_id)
    .bind(&expense.receipt_ref)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Flip the approval flag; returns affected rows
pub async fn set_approved(
    tx: &mut Transaction<'_, Postgres>,
    expense_id: Uuid,
    approved: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE expenses SET approved = $2 WHERE id = $1")
        .bind(expense_id)
        .bind(approved)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete(
    tx: &mut Transaction<'_, Postgres>,
    expense_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM expenses WHERE id = $1")
        .bind(expense_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

/// Branch expenses in a date window, newest first
pub async fn list(
    pool: &PgPool,
    location_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query_as::<_, Expense>(
        r#"
        SELECT id, location_id, delivery_id, employee_id, supplier_id, spent_on,
               amount, concept, category, approved, receipt_ref, created_at
        FROM expenses
        WHERE location_id = $1
          AND spent_on >= $2
          AND spent_on <= $3
        ORDER BY spent_on DESC, created_at DESC
        "#,
    )
    .bind(location_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}

/// Expenses not yet attached to any delivery, eligible to offset one
pub async fn list_unattached(
    pool: &PgPool,
    location_id: Uuid,
) -> Result<Vec<Expense>, sqlx::Error> {
    sqlx::query_as::<_, Expense>(
        r#"
        SELECT id, location_id, delivery_id, employee_id, supplier_id, spent_on,
               amount, concept, category, approved, receipt_ref, created_at
        FROM expenses
        WHERE location_id = $1
          AND delivery_id IS NULL
        ORDER BY spent_on DESC, created_at DESC
        "#,
    )
    .bind(location_id)
    .fetch_all(pool)
    .await
}

/// Sum of branch expenses over a period
pub async fn total_in_period(
    pool: &PgPool,
    location_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(amount), 0)
        FROM expenses
        WHERE location_id = $1
          AND spent_on >= $2
          AND spent_on <= $3
        "#,
    )
    .bind(location_id)
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await
}
