//! Order directory access: lookups, the settled-flag claim check, and the
//! unsettled cash-sale listing consumed by cash settlement.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Order summary as seen by the settlement core
#[derive(Debug, Clone, FromRow)]
pub struct Order {
    pub id: Uuid,
    pub number: String,
    pub order_date: NaiveDate,
    pub total: Decimal,
    pub customer_id: Uuid,
    pub location_id: Uuid,
    pub is_credit: bool,
    pub is_settled: bool,
    pub voided: bool,
}

/// Order joined with its customer's name, for line snapshots
#[derive(Debug, Clone, FromRow)]
pub struct OrderWithCustomer {
    pub id: Uuid,
    pub number: String,
    pub order_date: NaiveDate,
    pub total: Decimal,
    pub customer_id: Uuid,
    pub location_id: Uuid,
    pub is_credit: bool,
    pub is_settled: bool,
    pub voided: bool,
    pub customer_name: String,
}

/// Unsettled cash-sale order in a branch/date window
#[derive(Debug, Clone, FromRow)]
pub struct SettleableOrderRow {
    pub id: Uuid,
    pub number: String,
    pub order_date: NaiveDate,
    pub total: Decimal,
    pub customer_name: String,
}

pub async fn find_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as::<_, Order>(
        r#"
        SELECT id, number, order_date, total, customer_id, location_id,
               is_credit, is_settled, voided
        FROM orders
        WHERE id = $1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut **tx)
    .await
}

pub async fn find_with_customer_tx(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> Result<Option<OrderWithCustomer>, sqlx::Error> {
    sqlx::query_as::<_, OrderWithCustomer>(
        r#"
        SELECT o.id, o.number, o.order_date, o.total, o.customer_id,
               o.location_id, o.is_credit, o.is_settled, o.voided,
               cu.name AS customer_name
        FROM orders o
        INNER JOIN customers cu ON cu.id = o.customer_id
        WHERE o.id = $1
        "#,
    )
    .bind(order_id)
    .fetch_optional(&mut **tx)
    .await
}

/// Claim the settled flag: succeeds at most once per order.
pub async fn claim_settled(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE orders SET is_settled = TRUE WHERE id = $1 AND is_settled = FALSE",
    )
    .bind(order_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Release the settled flag (rejected or deleted delivery)
pub async fn release_settled(
    tx: &mut Transaction<'_, Postgres>,
    order_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE orders SET is_settled = FALSE WHERE id = $1")
        .bind(order_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Unsettled, non-voided cash-sale orders for a branch within a date window
pub async fn list_unsettled_cash(
    pool: &PgPool,
    location_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<SettleableOrderRow>, sqlx::Error> {
    sqlx::query_as::<_, SettleableOrderRow>(
        r#"
        SELECT o.id, o.number, o.order_date, o.total, cu.name AS customer_name
        FROM orders o
        INNER JOIN customers cu ON cu.id = o.customer_id
        WHERE o.location_id = $1
          AND o.is_credit = FALSE
          AND o.is_settled = FALSE
          AND o.voided = FALSE
          AND o.order_date >= $2
          AND o.order_date <= $3
        ORDER BY o.order_date, o.number
        "#,
    )
    .bind(location_id)
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await
}
