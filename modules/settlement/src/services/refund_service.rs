//! Refund processor
//!
//! One engine drives both variants: sale refunds (stock increments at the
//! selling location, credit adjustment for credit sales) and purchase
//! refunds (stock decrements at the originating location). Creation is
//! side-effect free; `process` is the one-way step that touches inventory
//! and credit. Quantities are bounded per original line by the remaining
//! unrefunded quantity, computed under a lock on the original item row in
//! the same transaction that inserts or processes the lines.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::contracts::refunds::{
    RefundLineRequest, RefundLineResponse, RefundMethod, RefundResponse, RefundStatus,
};
use crate::money::{clamp_non_negative, round2};
use crate::repos::refund_repo::{RefundDocument, RefundKind, RefundLineRow, RefundRow};
use crate::repos::{credit_repo, refund_repo, stock_repo};
use crate::validation::{self, ValidationError};

/// Errors that can occur during refund operations
#[derive(Debug, thiserror::Error)]
pub enum RefundError {
    #[error("{kind} refund not found: {id}")]
    RefundNotFound { kind: RefundKind, id: Uuid },

    #[error("Original {kind} document not found: {id}")]
    DocumentNotFound { kind: RefundKind, id: Uuid },

    #[error("Original {kind} document {id} is voided")]
    DocumentVoided { kind: RefundKind, id: Uuid },

    #[error("Original line item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Item {item_id} does not belong to document {document_id}")]
    ForeignItem { item_id: Uuid, document_id: Uuid },

    #[error(
        "Requested quantity {requested} exceeds remaining refundable {remaining} on item {item_id}"
    )]
    ExceedsRefundable {
        item_id: Uuid,
        requested: Decimal,
        remaining: Decimal,
    },

    #[error("Refund {0} is already processed")]
    AlreadyProcessed(Uuid),

    #[error("Refund {0} is voided")]
    RefundVoided(Uuid),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for refund operations
pub type RefundResult<T> = Result<T, RefundError>;

/// Everything needed to create a refund, variant-agnostic. Routes build
/// this from the sale/purchase request contracts.
#[derive(Debug, Clone)]
pub struct NewRefund {
    pub document_id: Uuid,
    pub reason: String,
    pub refund_date: Option<NaiveDate>,
    pub method: Option<RefundMethod>,
    pub discount: Option<Decimal>,
    pub lines: Vec<RefundLineRequest>,
}

/// Subtotal of one refund line
pub fn line_subtotal(quantity: Decimal, unit_price: Decimal) -> Decimal {
    round2(quantity * unit_price)
}

/// Refund total: subtotal minus flat discount, floored at zero
pub fn refund_total(subtotal: Decimal, discount: Decimal) -> Decimal {
    clamp_non_negative(round2(subtotal - discount))
}

/// Quantity still refundable on an original line
pub fn remaining_refundable(original: Decimal, already_refunded: Decimal) -> Decimal {
    clamp_non_negative(original - already_refunded)
}

/// Create a refund proposal in PENDING. No inventory or credit effect.
pub async fn create(pool: &PgPool, kind: RefundKind, req: NewRefund) -> RefundResult<RefundResponse> {
    validation::validate_reason(&req.reason)?;
    validation::validate_refund_lines(&req.lines)?;
    let discount = round2(req.discount.unwrap_or(Decimal::ZERO));
    validation::validate_non_negative_amount(discount)?;

    let mut tx = pool.begin().await?;

    let document = refund_repo::find_document_tx(&mut tx, kind, req.document_id)
        .await?
        .ok_or(RefundError::DocumentNotFound {
            kind,
            id: req.document_id,
        })?;
    if document.voided {
        return Err(RefundError::DocumentVoided {
            kind,
            id: req.document_id,
        });
    }

    let refund_id = Uuid::new_v4();
    let mut line_rows: Vec<RefundLineRow> = Vec::with_capacity(req.lines.len());
    let mut subtotal = Decimal::ZERO;

    for line in &req.lines {
        let item = refund_repo::lock_source_item(&mut tx, kind, line.item_id)
            .await?
            .ok_or(RefundError::ItemNotFound(line.item_id))?;
        if item.document_id != req.document_id {
            return Err(RefundError::ForeignItem {
                item_id: line.item_id,
                document_id: req.document_id,
            });
        }

        let quantity = round2(line.quantity);
        let already = refund_repo::processed_qty_for_item(&mut tx, kind, line.item_id).await?;
        let remaining = remaining_refundable(item.quantity, already);
        if quantity > remaining {
            return Err(RefundError::ExceedsRefundable {
                item_id: line.item_id,
                requested: quantity,
                remaining,
            });
        }

        let unit_price = round2(line.unit_price.unwrap_or(item.unit_price));
        let row = RefundLineRow {
            id: Uuid::new_v4(),
            refund_id,
            item_id: line.item_id,
            quantity,
            unit_price,
            line_subtotal: line_subtotal(quantity, unit_price),
        };
        subtotal += row.line_subtotal;
        line_rows.push(row);
    }

    let subtotal = round2(subtotal);
    let now = Utc::now();
    let refund = RefundRow {
        id: refund_id,
        document_id: req.document_id,
        refund_date: req.refund_date.unwrap_or_else(|| now.date_naive()),
        reason: req.reason,
        method: req.method.map(|m| m.as_str().to_string()),
        subtotal,
        discount,
        total: refund_total(subtotal, discount),
        status: RefundStatus::Pending.as_str().to_string(),
        processed: false,
        created_at: now,
        processed_at: None,
    };

    refund_repo::insert(&mut tx, kind, &refund).await?;
    for row in &line_rows {
        refund_repo::insert_line(&mut tx, kind, row).await?;
    }

    tx.commit().await?;

    tracing::info!(
        refund_id = %refund_id,
        kind = %kind,
        document_id = %refund.document_id,
        lines = line_rows.len(),
        total = %refund.total,
        "Refund created"
    );
    Ok(refund_response(refund, &line_rows))
}

/// Process a PENDING refund: the only operation with side effects, and a
/// one-way door. Inventory moves per line; a sale refund against a credit
/// sale also reduces the customer's credit debt (floored at zero, closing
/// the credit when the balance reaches zero).
pub async fn process(pool: &PgPool, kind: RefundKind, refund_id: Uuid) -> RefundResult<RefundResponse> {
    let mut tx = pool.begin().await?;

    let mut refund = lock_pending(&mut tx, kind, refund_id).await?;

    let document = refund_repo::find_document_tx(&mut tx, kind, refund.document_id)
        .await?
        .ok_or(RefundError::DocumentNotFound {
            kind,
            id: refund.document_id,
        })?;

    let lines = refund_repo::lines_tx(&mut tx, kind, refund_id).await?;
    for line in &lines {
        let item = refund_repo::lock_source_item(&mut tx, kind, line.item_id)
            .await?
            .ok_or(RefundError::ItemNotFound(line.item_id))?;

        // Re-check the bound under the item lock: other refunds on the same
        // line may have been processed since this one was created.
        let already = refund_repo::processed_qty_for_item(&mut tx, kind, line.item_id).await?;
        let remaining = remaining_refundable(item.quantity, already);
        if line.quantity > remaining {
            return Err(RefundError::ExceedsRefundable {
                item_id: line.item_id,
                requested: line.quantity,
                remaining,
            });
        }

        // Sale refunds put goods back on the shelf; purchase refunds take
        // them off (negative balances permitted).
        let delta = match kind {
            RefundKind::Sale => line.quantity,
            RefundKind::Purchase => -line.quantity,
        };
        let resulting =
            stock_repo::adjust(&mut tx, item.product_id, document.location_id, delta).await?;
        tracing::debug!(
            refund_id = %refund_id,
            product_id = %item.product_id,
            location_id = %document.location_id,
            delta = %delta,
            resulting = %resulting,
            "Stock adjusted for refund line"
        );
    }

    if kind == RefundKind::Sale && document.is_credit {
        adjust_credit_for_refund(&mut tx, &document, refund.total).await?;
    }

    refund_repo::mark_processed(&mut tx, kind, refund_id).await?;
    refund.status = RefundStatus::Processed.as_str().to_string();
    refund.processed = true;
    refund.processed_at = Some(Utc::now());

    tx.commit().await?;

    tracing::info!(
        refund_id = %refund_id,
        kind = %kind,
        total = %refund.total,
        "Refund processed"
    );
    Ok(refund_response(refund, &lines))
}

/// Void a PENDING refund. Nothing to reverse.
pub async fn void(pool: &PgPool, kind: RefundKind, refund_id: Uuid) -> RefundResult<RefundResponse> {
    let mut tx = pool.begin().await?;

    let mut refund = lock_pending(&mut tx, kind, refund_id).await?;
    refund_repo::set_voided(&mut tx, kind, refund_id).await?;
    refund.status = RefundStatus::Voided.as_str().to_string();

    let lines = refund_repo::lines_tx(&mut tx, kind, refund_id).await?;
    tx.commit().await?;

    tracing::info!(refund_id = %refund_id, kind = %kind, "Refund voided");
    Ok(refund_response(refund, &lines))
}

/// Delete a refund that was never processed.
pub async fn delete(pool: &PgPool, kind: RefundKind, refund_id: Uuid) -> RefundResult<()> {
    let mut tx = pool.begin().await?;

    let refund = refund_repo::lock(&mut tx, kind, refund_id)
        .await?
        .ok_or(RefundError::RefundNotFound {
            kind,
            id: refund_id,
        })?;
    if refund.processed {
        return Err(RefundError::AlreadyProcessed(refund_id));
    }

    refund_repo::delete(&mut tx, kind, refund_id).await?;
    tx.commit().await?;

    tracing::info!(refund_id = %refund_id, kind = %kind, "Refund deleted");
    Ok(())
}

/// Read one refund with its lines.
pub async fn get(pool: &PgPool, kind: RefundKind, refund_id: Uuid) -> RefundResult<RefundResponse> {
    let refund = refund_repo::find(pool, kind, refund_id)
        .await?
        .ok_or(RefundError::RefundNotFound {
            kind,
            id: refund_id,
        })?;
    let lines = refund_repo::lines(pool, kind, refund_id).await?;
    Ok(refund_response(refund, &lines))
}

/// All refunds raised against an original document.
pub async fn list_for_document(
    pool: &PgPool,
    kind: RefundKind,
    document_id: Uuid,
) -> RefundResult<Vec<RefundResponse>> {
    let refunds = refund_repo::list_for_document(pool, kind, document_id).await?;
    let mut responses = Vec::with_capacity(refunds.len());
    for refund in refunds {
        let lines = refund_repo::lines(pool, kind, refund.id).await?;
        responses.push(refund_response(refund, &lines));
    }
    Ok(responses)
}

/// Lock a refund header and require it to still be PENDING.
async fn lock_pending(
    tx: &mut Transaction<'_, Postgres>,
    kind: RefundKind,
    refund_id: Uuid,
) -> RefundResult<RefundRow> {
    let refund = refund_repo::lock(tx, kind, refund_id)
        .await?
        .ok_or(RefundError::RefundNotFound {
            kind,
            id: refund_id,
        })?;
    match RefundStatus::parse(&refund.status) {
        Some(RefundStatus::Pending) => Ok(refund),
        Some(RefundStatus::Processed) => Err(RefundError::AlreadyProcessed(refund_id)),
        Some(RefundStatus::Voided) | None => Err(RefundError::RefundVoided(refund_id)),
    }
}

/// Reduce the customer's credit debt by the refund total, closing the
/// credit when the balance reaches zero while it was open.
async fn adjust_credit_for_refund(
    tx: &mut Transaction<'_, Postgres>,
    document: &RefundDocument,
    refund_total: Decimal,
) -> Result<(), sqlx::Error> {
    let Some(customer_id) = document.customer_id else {
        return Ok(());
    };
    let Some(credit) = credit_repo::lock_by_customer(tx, customer_id).await? else {
        return Ok(());
    };

    let new_debt = clamp_non_negative(round2(credit.debt - refund_total));
    credit_repo::set_debt(tx, credit.id, new_debt).await?;

    if new_debt == Decimal::ZERO && !credit.is_closed {
        credit_repo::close(tx, credit.id).await?;
        tracing::info!(credit_id = %credit.id, "Credit closed by refund");
    }

    tracing::info!(
        credit_id = %credit.id,
        refund_total = %refund_total,
        debt = %new_debt,
        "Credit debt reduced by sale refund"
    );
    Ok(())
}

fn refund_response(refund: RefundRow, lines: &[RefundLineRow]) -> RefundResponse {
    RefundResponse {
        id: refund.id,
        document_id: refund.document_id,
        refund_date: refund.refund_date,
        reason: refund.reason,
        method: refund.method.as_deref().and_then(RefundMethod::parse),
        subtotal: refund.subtotal,
        discount: refund.discount,
        total: refund.total,
        status: RefundStatus::parse(&refund.status).unwrap_or(RefundStatus::Pending),
        processed: refund.processed,
        created_at: refund.created_at,
        processed_at: refund.processed_at,
        lines: lines
            .iter()
            .map(|l| RefundLineResponse {
                id: l.id,
                item_id: l.item_id,
                quantity: l.quantity,
                unit_price: l.unit_price,
                line_subtotal: l.line_subtotal,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_subtotal_rounds_to_two_places() {
        assert_eq!(line_subtotal(dec!(2.5), dec!(33.333)), dec!(83.33));
        assert_eq!(line_subtotal(dec!(3), dec!(19.99)), dec!(59.97));
    }

    #[test]
    fn test_refund_total_applies_flat_discount() {
        assert_eq!(refund_total(dec!(100.00), dec!(15.50)), dec!(84.50));
    }

    #[test]
    fn test_refund_total_floors_at_zero() {
        assert_eq!(refund_total(dec!(50), dec!(80)), Decimal::ZERO);
    }

    #[test]
    fn test_remaining_refundable() {
        assert_eq!(remaining_refundable(dec!(5), dec!(2)), dec!(3));
        assert_eq!(remaining_refundable(dec!(5), dec!(5)), Decimal::ZERO);
        // Over-refunded history must not produce a negative remainder
        assert_eq!(remaining_refundable(dec!(5), dec!(6)), Decimal::ZERO);
    }
}
