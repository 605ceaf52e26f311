//! Read-only lookups against the customer/employee/location/supplier
//! directories, used for validation and name snapshotting.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

pub async fn location_exists(
    tx: &mut Transaction<'_, Postgres>,
    location_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM locations WHERE id = $1)")
        .bind(location_id)
        .fetch_one(&mut **tx)
        .await
}

pub async fn employee_exists(
    tx: &mut Transaction<'_, Postgres>,
    employee_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM employees WHERE id = $1)")
        .bind(employee_id)
        .fetch_one(&mut **tx)
        .await
}

pub async fn supplier_exists(
    tx: &mut Transaction<'_, Postgres>,
    supplier_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM suppliers WHERE id = $1)")
        .bind(supplier_id)
        .fetch_one(&mut **tx)
        .await
}

pub async fn customer_exists(
    tx: &mut Transaction<'_, Postgres>,
    customer_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM customers WHERE id = $1)")
        .bind(customer_id)
        .fetch_one(&mut **tx)
        .await
}

/// Customer display name, used when assembling credit views
pub async fn customer_name(
    pool: &PgPool,
    customer_id: Uuid,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>("SELECT name FROM customers WHERE id = $1")
        .bind(customer_id)
        .fetch_optional(pool)
        .await
}
