//! Inventory stock adjustment, the only inventory primitive the settlement
//! core consumes (refund processing).

use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

/// Apply a stock delta at a location, creating the row when absent.
///
/// The delta may be negative and the resulting quantity may go below zero;
/// overselling is tolerated and surfaced by inventory reports, not blocked
/// here. Returns the resulting quantity.
pub async fn adjust(
    tx: &mut Transaction<'_, Postgres>,
    product_id: Uuid,
    location_id: Uuid,
    delta: Decimal,
) -> Result<Decimal, sqlx::Error> {
    sqlx::query_scalar::<_, Decimal>(
        r#"
        INSERT INTO inventory_stock (product_id, location_id, quantity, updated_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (product_id, location_id)
        DO UPDATE SET
            quantity = inventory_stock.quantity + EXCLUDED.quantity,
            updated_at = NOW()
        RETURNING quantity
        "#,
    )
    .bind(product_id)
    .bind(location_id)
    .bind(delta)
    .fetch_one(&mut **tx)
    .await
}
