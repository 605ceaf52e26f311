//! Repository shared by the sale and purchase refund variants.
//!
//! Both variants carry the same header/line shape and lifecycle; the kind
//! selects the table pair and the original-document/item tables. Purchase
//! refunds have no refund method or discount — those surface as NULL/0.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Which refund variant a call targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundKind {
    Sale,
    Purchase,
}

impl RefundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sale => "sale",
            Self::Purchase => "purchase",
        }
    }
}

impl std::fmt::Display for RefundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refund header row, variant-agnostic
#[derive(Debug, Clone, FromRow)]
pub struct RefundRow {
    pub id: Uuid,
    pub document_id: Uuid,
    pub refund_date: NaiveDate,
    pub reason: String,
    pub method: Option<String>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub status: String,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// Refund line row
#[derive(Debug, Clone, FromRow)]
pub struct RefundLineRow {
    pub id: Uuid,
    pub refund_id: Uuid,
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_subtotal: Decimal,
}

/// Original order_item / purchase_item being refunded against
#[derive(Debug, Clone, FromRow)]
pub struct SourceItem {
    pub id: Uuid,
    pub document_id: Uuid,
    pub product_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

/// Original document (order or purchase) header, variant-agnostic
#[derive(Debug, Clone, FromRow)]
pub struct RefundDocument {
    pub id: Uuid,
    pub location_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub is_credit: bool,
    pub voided: bool,
}

pub async fn find_document_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: RefundKind,
    document_id: Uuid,
) -> Result<Option<RefundDocument>, sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => {
            r#"
            SELECT id, location_id, customer_id, is_credit, voided
            FROM orders
            WHERE id = $1
            "#
        }
        RefundKind::Purchase => {
            r#"
            SELECT id, location_id, NULL::UUID AS customer_id,
                   FALSE AS is_credit, voided
            FROM purchases
            WHERE id = $1
            "#
        }
    };
    sqlx::query_as::<_, RefundDocument>(sql)
        .bind(document_id)
        .fetch_optional(&mut **tx)
        .await
}

/// Lock an original item row; the remaining-quantity check and the line
/// insert happen under this lock.
pub async fn lock_source_item(
    tx: &mut Transaction<'_, Postgres>,
    kind: RefundKind,
    item_id: Uuid,
) -> Result<Option<SourceItem>, sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => {
            r#"
            SELECT id, order_id AS document_id, product_id, quantity, unit_price
            FROM order_items
            WHERE id = $1
            FOR UPDATE
            "#
        }
        RefundKind::Purchase => {
            r#"
            SELECT id, purchase_id AS document_id, product_id, quantity, unit_price
            FROM purchase_items
            WHERE id = $1
            FOR UPDATE
            "#
        }
    };
    sqlx::query_as::<_, SourceItem>(sql)
        .bind(item_id)
        .fetch_optional(&mut **tx)
        .await
}

/// Quantity already refunded against an original item by PROCESSED refunds
pub async fn processed_qty_for_item(
    tx: &mut Transaction<'_, Postgres>,
    kind: RefundKind,
    item_id: Uuid,
) -> Result<Decimal, sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => {
            r#"
            SELECT COALESCE(SUM(l.quantity), 0)
            FROM sale_refund_lines l
            INNER JOIN sale_refunds r ON r.id = l.refund_id
            WHERE l.item_id = $1
              AND r.status = 'PROCESSED'
            "#
        }
        RefundKind::Purchase => {
            r#"
            SELECT COALESCE(SUM(l.quantity), 0)
            FROM purchase_refund_lines l
            INNER JOIN purchase_refunds r ON r.id = l.refund_id
            WHERE l.item_id = $1
              AND r.status = 'PROCESSED'
            "#
        }
    };
    sqlx::query_scalar::<_, Decimal>(sql)
        .bind(item_id)
        .fetch_one(&mut **tx)
        .await
}

pub async fn insert(
    tx: &mut Transaction<'_, Postgres>,
    kind: RefundKind,
    refund: &RefundRow,
) -> Result<(), sqlx::Error> {
    match kind {
        RefundKind::Sale => {
            sqlx::query(
                r#"
                INSERT INTO sale_refunds
                    (id, order_id, refund_date, reason, method, subtotal,
                     discount, total, status, processed)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                "#,
            )
            .bind(refund.id)
            .bind(refund.document_id)
            .bind(refund.refund_date)
            .bind(&refund.reason)
            .bind(refund.method.as_deref().unwrap_or("CASH"))
            .bind(refund.subtotal)
            .bind(refund.discount)
            .bind(refund.total)
            .bind(&refund.status)
            .bind(refund.processed)
            .execute(&mut **tx)
            .await?;
        }
        RefundKind::Purchase => {
            sqlx::query(
                r#"
                INSERT INTO purchase_refunds
                    (id, purchase_id, refund_date, reason, subtotal, total,
                     status, processed)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(refund.id)
            .bind(refund.document_id)
            .bind(refund.refund_date)
            .bind(&refund.reason)
            .bind(refund.subtotal)
            .bind(refund.total)
            .bind(&refund.status)
            .bind(refund.processed)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}

pub async fn find(
    pool: &PgPool,
    kind: RefundKind,
    refund_id: Uuid,
) -> Result<Option<RefundRow>, sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => {
            r#"
            SELECT id, order_id AS document_id, refund_date, reason, method,
                   subtotal, discount, total, status, processed, created_at,
                   processed_at
            FROM sale_refunds
            WHERE id = $1
            "#
        }
        RefundKind::Purchase => {
            r#"
            SELECT id, purchase_id AS document_id, refund_date, reason,
                   NULL::TEXT AS method, subtotal, 0::NUMERIC AS discount,
                   total, status, processed, created_at, processed_at
            FROM purchase_refunds
            WHERE id = $1
            "#
        }
    };
    sqlx::query_as::<_, RefundRow>(sql)
        .bind(refund_id)
        .fetch_optional(pool)
        .await
}

/// Lock a refund header for a state transition
pub async fn lock(
    tx: &mut Transaction<'_, Postgres>,
    kind: RefundKind,
    refund_id: Uuid,
) -> Result<Option<RefundRow>, sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => {
            r#"
            SELECT id, order_id AS document_id, refund_date, reason, method,
                   subtotal, discount, total, status, processed, created_at,
                   processed_at
            FROM sale_refunds
            WHERE id = $1
            FOR UPDATE
            "#
        }
        RefundKind::Purchase => {
            r#"
            SELECT id, purchase_id AS document_id, refund_date, reason,
                   NULL::TEXT AS method, subtotal, 0::NUMERIC AS discount,
                   total, status, processed, created_at, processed_at
            FROM purchase_refunds
            WHERE id = $1
            FOR UPDATE
            "#
        }
    };
    sqlx::query_as::<_, RefundRow>(sql)
        .bind(refund_id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn list_for_document(
    pool: &PgPool,
    kind: RefundKind,
    document_id: Uuid,
) -> Result<Vec<RefundRow>, sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => {
            r#"
            SELECT id, order_id AS document_id, refund_date, reason, method,
                   subtotal, discount, total, status, processed, created_at,
                   processed_at
            FROM sale_refunds
            WHERE order_id = $1
            ORDER BY created_at
            "#
        }
        RefundKind::Purchase => {
            r#"
            SELECT id, purchase_id AS document_id, refund_date, reason,
                   NULL::TEXT AS method, subtotal, 0::NUMERIC AS discount,
                   total, status, processed, created_at, processed_at
            FROM purchase_refunds
            WHERE purchase_id = $1
            ORDER BY created_at
            "#
        }
    };
    sqlx::query_as::<_, RefundRow>(sql)
        .bind(document_id)
        .fetch_all(pool)
        .await
}

pub async fn mark_processed(
    tx: &mut Transaction<'_, Postgres>,
    kind: RefundKind,
    refund_id: Uuid,
) -> Result<(), sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => {
            "UPDATE sale_refunds \
             SET status = 'PROCESSED', processed = TRUE, processed_at = NOW() \
             WHERE id = $1"
        }
        RefundKind::Purchase => {
            "UPDATE purchase_refunds \
             SET status = 'PROCESSED', processed = TRUE, processed_at = NOW() \
             WHERE id = $1"
        }
    };
    sqlx::query(sql).bind(refund_id).execute(&mut **tx).await?;
    Ok(())
}

pub async fn set_voided(
    tx: &mut Transaction<'_, Postgres>,
    kind: RefundKind,
    refund_id: Uuid,
) -> Result<(), sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => "UPDATE sale_refunds SET status = 'VOIDED' WHERE id = $1",
        RefundKind::Purchase => "UPDATE purchase_refunds SET status = 'VOIDED' WHERE id = $1",
    };
    sqlx::query(sql).bind(refund_id).execute(&mut **tx).await?;
    Ok(())
}

pub async fn delete(
    tx: &mut Transaction<'_, Postgres>,
    kind: RefundKind,
    refund_id: Uuid,
) -> Result<(), sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => "DELETE FROM sale_refunds WHERE id = $1",
        RefundKind::Purchase => "DELETE FROM purchase_refunds WHERE id = $1",
    };
    sqlx::query(sql).bind(refund_id).execute(&mut **tx).await?;
    Ok(())
}

pub async fn insert_line(
    tx: &mut Transaction<'_, Postgres>,
    kind: RefundKind,
    line: &RefundLineRow,
) -> Result<(), sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => {
            r#"
            INSERT INTO sale_refund_lines
                (id, refund_id, item_id, quantity, unit_price, line_subtotal)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#
        }
        RefundKind::Purchase => {
            r#"
            INSERT INTO purchase_refund_lines
                (id, refund_id, item_id, quantity, unit_price, line_subtotal)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#
        }
    };
    sqlx::query(sql)
        .bind(line.id)
        .bind(line.refund_id)
        .bind(line.item_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.line_subtotal)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

pub async fn lines(
    pool: &PgPool,
    kind: RefundKind,
    refund_id: Uuid,
) -> Result<Vec<RefundLineRow>, sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => {
            "SELECT id, refund_id, item_id, quantity, unit_price, line_subtotal \
             FROM sale_refund_lines WHERE refund_id = $1 ORDER BY id"
        }
        RefundKind::Purchase => {
            "SELECT id, refund_id, item_id, quantity, unit_price, line_subtotal \
             FROM purchase_refund_lines WHERE refund_id = $1 ORDER BY id"
        }
    };
    sqlx::query_as::<_, RefundLineRow>(sql)
        .bind(refund_id)
        .fetch_all(pool)
        .await
}

pub async fn lines_tx(
    tx: &mut Transaction<'_, Postgres>,
    kind: RefundKind,
    refund_id: Uuid,
) -> Result<Vec<RefundLineRow>, sqlx::Error> {
    let sql = match kind {
        RefundKind::Sale => {
            "SELECT id, refund_id, item_id, quantity, unit_price, line_subtotal \
             FROM sale_refund_lines WHERE refund_id = $1 ORDER BY id"
        }
        RefundKind::Purchase => {
            "SELECT id, refund_id, item_id, quantity, unit_price, line_subtotal \
             FROM purchase_refund_lines WHERE refund_id = $1 ORDER BY id"
        }
    };
    sqlx::query_as::<_, RefundLineRow>(sql)
        .bind(refund_id)
        .fetch_all(&mut **tx)
        .await
}
