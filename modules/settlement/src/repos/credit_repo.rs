//! Repository for customer credits and their order association set.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Customer credit row
#[derive(Debug, Clone, FromRow)]
pub struct Credit {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub debt: Decimal,
    pub is_closed: bool,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One associated order, as listed on the credit
#[derive(Debug, Clone, FromRow)]
pub struct CreditOrderRow {
    pub order_id: Uuid,
    pub number: String,
    pub order_date: NaiveDate,
    pub total: Decimal,
}

/// Fetch a credit without locking
pub async fn find(pool: &PgPool, credit_id: Uuid) -> Result<Option<Credit>, sqlx::Error> {
    sqlx::query_as::<_, Credit>(
        r#"
        SELECT id, customer_id, debt, is_closed, closed_at, created_at, updated_at
        FROM credits
        WHERE id = $1
        "#,
    )
    .bind(credit_id)
    .fetch_optional(pool)
    .await
}

/// Lock a credit row for the duration of the transaction.
///
/// Every ledger/payment mutation takes this lock first; it serializes
/// recomputes per credit id.
pub async fn lock(
    tx: &mut Transaction<'_, Postgres>,
    credit_id: Uuid,
) -> Result<Option<Credit>, sqlx::Error> {
    sqlx::query_as::<_, Credit>(
        r#"
        SELECT id, customer_id, debt, is_closed, closed_at, created_at, updated_at
        FROM credits
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(credit_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Lock the credit belonging to a customer, if any
pub async fn lock_by_customer(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: Uuid,
) -> Result<Option<Credit>, sqlx::Error> {
    sqlx::query_as::<_, Credit>(
        r#"
        SELECT id, customer_id, debt, is_closed, closed_at, created_at, updated_at
        FROM credits
        WHERE customer_id = $1
        FOR UPDATE
        "#,
    )
    .bind(customer_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Insert a fresh credit with zero debt
pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    credit_id: Uuid,
    customer_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO credits (id, customer_id) VALUES ($1, $2)")
        .bind(credit_id)
        .bind(customer_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Persist a recomputed debt
pub async fn set_debt(
    tx: &mut Transaction<'_, Postgres>,
    credit_id: Uuid,
    debt: Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE credits SET debt = $2, updated_at = NOW() WHERE id = $1")
        .bind(credit_id)
        .bind(debt)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Close a credit (balance reached zero)
pub async fn close(
    tx: &mut Transaction<'_, Postgres>,
    credit_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE credits SET is_closed = TRUE, closed_at = NOW(), updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(credit_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Sum of the totals of all orders associated with the credit
pub async fn sum_order_totals(
    tx: &mut Transaction<'_, Postgres>,
    credit_id: Uuid,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(o.total), 0)
        FROM credit_orders co
        INNER JOIN orders o ON o.id = co.order_id
        WHERE co.credit_id = $1
        "#,
    )
    .bind(credit_id)
    .fetch_one(&mut **tx)
    .await
}

/// Add an order to the credit's association set.
///
/// The unique constraint on `credit_orders.order_id` rejects an order that
/// is already charged to any credit.
pub async fn associate(
    tx: &mut Transaction<'_, Postgres>,
    credit_id: Uuid,
    order_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO credit_orders (credit_id, order_id) VALUES ($1, $2)")
        .bind(credit_id)
        .bind(order_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Remove an order from the association set; returns affected rows
pub async fn dissociate(
    tx: &mut Transaction<'_, Postgres>,
    credit_id: Uuid,
    order_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM credit_orders WHERE credit_id = $1 AND order_id = $2")
            .bind(credit_id)
            .bind(order_id)
            .execute(&mut **tx)
            .await?;
    Ok(result.rows_affected())
}

/// List the credit's associated orders, oldest first
pub async fn associated_orders(
    pool: &PgPool,
    credit_id: Uuid,
) -> Result<Vec<CreditOrderRow>, sqlx::Error> {
    sqlx::query_as::<_, CreditOrderRow>(
        r#"
        SELECT o.id AS order_id, o.number, o.order_date, o.total
        FROM credit_orders co
        INNER JOIN orders o ON o.id = co.order_id
        WHERE co.credit_id = $1
        ORDER BY o.order_date, o.number
        "#,
    )
    .bind(credit_id)
    .fetch_all(pool)
    .await
}
