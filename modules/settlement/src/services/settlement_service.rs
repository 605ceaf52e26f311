//! Cash settlement service
//!
//! Batches a field employee's collected receipts (cash-sale orders and
//! credit payment collections) into one cash delivery with frozen line
//! snapshots and a verification state machine. Settling a source and
//! inserting its line happen in the same transaction; the conditional
//! settled-flag claim plus the unique line-source index keep any order or
//! payment out of two live deliveries at once.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::contracts::deliveries::{
    CreateDeliveryRequest, DeliveryLineResponse, DeliveryResponse, DeliveryStatus,
    SettleableOrder, SettleablePayment, SettleableResponse, SourceKind,
};
use crate::money::{round2, sum2, within_tolerance};
use crate::repos::delivery_repo::{CashDelivery, DeliveryLine};
use crate::repos::{delivery_repo, directory_repo, order_repo, payment_repo};
use crate::services::is_unique_violation;
use crate::validation::{self, ValidationError};

/// Errors that can occur during cash settlement
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("Delivery not found: {0}")]
    DeliveryNotFound(Uuid),

    #[error("Location not found: {0}")]
    LocationNotFound(Uuid),

    #[error("Employee not found: {0}")]
    EmployeeNotFound(Uuid),

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    #[error("Order {0} is voided and cannot be settled")]
    VoidedOrder(Uuid),

    #[error("Order {0} is a credit sale; only its payments are settleable")]
    CreditSaleOrder(Uuid),

    #[error("{kind} {id} is already settled in a cash delivery")]
    AlreadySettled { kind: &'static str, id: Uuid },

    #[error("A delivery already exists for this location, employee and date")]
    DuplicateBatch,

    #[error("Delivery is {from:?}; cannot {action}")]
    InvalidTransition {
        from: DeliveryStatus,
        action: &'static str,
    },

    #[error("Unknown delivery status in store: {0}")]
    UnknownStatus(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for settlement operations
pub type SettlementResult<T> = Result<T, SettlementError>;

/// Payment-method breakdown of a delivery
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MethodBreakdown {
    pub cash: Decimal,
    pub transfer: Decimal,
    pub check: Decimal,
    pub deposit: Decimal,
}

impl MethodBreakdown {
    pub fn sum(&self) -> Decimal {
        sum2([self.cash, self.transfer, self.check, self.deposit])
    }

    pub fn is_zero(&self) -> bool {
        self.sum() == Decimal::ZERO
    }
}

/// Resolve a delivery's aggregate amount from the supplied breakdown and
/// optional declared amount.
///
/// A declared amount that diverges from a non-zero breakdown by more than
/// the 0.01 tolerance is rejected; with no declared amount the breakdown
/// sum is used.
pub fn resolve_declared_amount(
    breakdown: &MethodBreakdown,
    declared: Option<Decimal>,
) -> Result<Decimal, ValidationError> {
    match declared {
        Some(declared) => {
            let declared = round2(declared);
            let computed = breakdown.sum();
            if !breakdown.is_zero() && !within_tolerance(declared, computed) {
                return Err(ValidationError::BreakdownMismatch { declared, computed });
            }
            Ok(declared)
        }
        None => Ok(breakdown.sum()),
    }
}

/// Reconciliation of the stored amount against the breakdown sum: returns
/// the corrected amount when they diverge beyond tolerance, None when the
/// stored amount stands.
pub fn reconcile_amount(amount: Decimal, breakdown_sum: Decimal) -> Option<Decimal> {
    if within_tolerance(amount, breakdown_sum) {
        None
    } else {
        Some(breakdown_sum)
    }
}

/// Unsettled cash-sale orders and credit payments for a branch/date window.
pub async fn list_settleable(
    pool: &PgPool,
    location_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> SettlementResult<SettleableResponse> {
    let orders = order_repo::list_unsettled_cash(pool, location_id, from, to)
        .await?
        .into_iter()
        .map(|o| SettleableOrder {
            id: o.id,
            number: o.number,
            order_date: o.order_date,
            total: o.total,
            customer_name: o.customer_name,
        })
        .collect();

    let payments = payment_repo::list_unsettled(pool, location_id, from, to)
        .await?
        .into_iter()
        .map(|p| SettleablePayment {
            id: p.id,
            paid_on: p.paid_on,
            amount: p.amount,
            withholding_amount: p.withholding_amount,
            order_number: p.order_number,
            customer_name: p.customer_name,
        })
        .collect();

    Ok(SettleableResponse { orders, payments })
}

/// Create a PENDING delivery and attach the given orders and payments.
///
/// Each source is claimed (settled flag) and snapshotted into a line inside
/// the same transaction; the attached lines are authoritative for the
/// aggregate amount.
pub async fn create(
    pool: &PgPool,
    req: CreateDeliveryRequest,
) -> SettlementResult<DeliveryResponse> {
    let breakdown = MethodBreakdown {
        cash: round2(req.cash_amount.unwrap_or(Decimal::ZERO)),
        transfer: round2(req.transfer_amount.unwrap_or(Decimal::ZERO)),
        check: round2(req.check_amount.unwrap_or(Decimal::ZERO)),
        deposit: round2(req.deposit_amount.unwrap_or(Decimal::ZERO)),
    };
    for component in [
        breakdown.cash,
        breakdown.transfer,
        breakdown.check,
        breakdown.deposit,
    ] {
        validation::validate_non_negative_amount(component)?;
    }
    let amount = resolve_declared_amount(&breakdown, req.amount)?;

    let mut tx = pool.begin().await?;

    if !directory_repo::location_exists(&mut tx, req.location_id).await? {
        return Err(SettlementError::LocationNotFound(req.location_id));
    }
    if !directory_repo::employee_exists(&mut tx, req.employee_id).await? {
        return Err(SettlementError::EmployeeNotFound(req.employee_id));
    }

    let delivery_date = req
        .delivery_date
        .unwrap_or_else(|| Utc::now().date_naive());

    if delivery_repo::active_batch_exists(&mut tx, req.location_id, req.employee_id, delivery_date)
        .await?
    {
        return Err(SettlementError::DuplicateBatch);
    }

    let delivery_id = Uuid::new_v4();
    let now = Utc::now();
    let mut delivery = CashDelivery {
        id: delivery_id,
        location_id: req.location_id,
        employee_id: req.employee_id,
        delivery_date,
        cash_amount: breakdown.cash,
        transfer_amount: breakdown.transfer,
        check_amount: breakdown.check,
        deposit_amount: breakdown.deposit,
        amount,
        withholding_total: Decimal::ZERO,
        modality: req.modality,
        status: DeliveryStatus::Pending.as_str().to_string(),
        declared_amount: None,
        rejection_reason: None,
        created_at: now,
        updated_at: now,
    };

    delivery_repo::insert(&mut tx, &delivery)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                SettlementError::DuplicateBatch
            } else {
                SettlementError::Database(e)
            }
        })?;

    let mut lines: Vec<DeliveryLineResponse> = Vec::new();
    let mut lines_total = Decimal::ZERO;
    let mut withholding_total = Decimal::ZERO;

    for order_id in &req.order_ids {
        let order = order_repo::find_with_customer_tx(&mut tx, *order_id)
            .await?
            .ok_or(SettlementError::OrderNotFound(*order_id))?;
        if order.voided {
            return Err(SettlementError::VoidedOrder(*order_id));
        }
        if order.is_credit {
            return Err(SettlementError::CreditSaleOrder(*order_id));
        }
        if !order_repo::claim_settled(&mut tx, *order_id).await? {
            return Err(SettlementError::AlreadySettled {
                kind: "Order",
                id: *order_id,
            });
        }

        let line = DeliveryLine {
            id: Uuid::new_v4(),
            delivery_id,
            source_kind: SourceKind::Order.as_str().to_string(),
            source_id: *order_id,
            amount: order.total,
            order_number: Some(order.number),
            order_date: Some(order.order_date),
            credit_sale: false,
            customer_name: Some(order.customer_name),
            released: false,
        };
        insert_line(&mut tx, &line).await?;
        lines_total += line.amount;
        lines.push(line_response(&line));
    }

    for payment_id in &req.payment_ids {
        let payment = payment_repo::find_with_customer_tx(&mut tx, *payment_id)
            .await?
            .ok_or(SettlementError::PaymentNotFound(*payment_id))?;
        if !payment_repo::claim_settled(&mut tx, *payment_id).await? {
            return Err(SettlementError::AlreadySettled {
                kind: "Payment",
                id: *payment_id,
            });
        }

        let line = DeliveryLine {
            id: Uuid::new_v4(),
            delivery_id,
            source_kind: SourceKind::Payment.as_str().to_string(),
            source_id: *payment_id,
            amount: payment.amount,
            order_number: payment.order_number,
            order_date: Some(payment.paid_on),
            credit_sale: true,
            customer_name: Some(payment.customer_name),
            released: false,
        };
        insert_line(&mut tx, &line).await?;
        lines_total += line.amount;
        withholding_total += payment.withholding_amount;
        lines.push(line_response(&line));
    }

    if !lines.is_empty() {
        // The attached lines are authoritative over a manually supplied
        // figure; a supplied breakdown that contradicts them is rejected
        // rather than persisted as a divergent total.
        let computed = round2(lines_total);
        if !breakdown.is_zero() && !within_tolerance(breakdown.sum(), computed) {
            return Err(SettlementError::Validation(
                ValidationError::BreakdownMismatch {
                    declared: breakdown.sum(),
                    computed,
                },
            ));
        }
        if delivery.amount != Decimal::ZERO && !within_tolerance(delivery.amount, computed) {
            tracing::warn!(
                delivery_id = %delivery_id,
                declared = %delivery.amount,
                computed = %computed,
                "Reconciled delivery amount to the attached lines"
            );
        }
        delivery.amount = computed;
        if breakdown.is_zero() {
            delivery.cash_amount = computed;
        }
    }
    delivery.withholding_total = round2(withholding_total);

    delivery_repo::update_totals(
        &mut tx,
        delivery_id,
        delivery.cash_amount,
        delivery.transfer_amount,
        delivery.check_amount,
        delivery.deposit_amount,
        delivery.amount,
        delivery.withholding_total,
    )
    .await?;

    tx.commit().await?;

    tracing::info!(
        delivery_id = %delivery_id,
        location_id = %delivery.location_id,
        employee_id = %delivery.employee_id,
        lines = lines.len(),
        amount = %delivery.amount,
        "Cash delivery created"
    );

    Ok(delivery_response(delivery, lines))
}

/// Confirm a PENDING delivery as DELIVERED with the employee's declared
/// amount, reconciling the aggregate against the method breakdown.
pub async fn confirm(
    pool: &PgPool,
    delivery_id: Uuid,
    declared_amount: Decimal,
) -> SettlementResult<DeliveryResponse> {
    let declared_amount = round2(declared_amount);
    let mut tx = pool.begin().await?;

    let mut delivery = lock_delivery(&mut tx, delivery_id).await?;
    let status = parse_status(&delivery.status)?;
    if !status.can_transition(DeliveryStatus::Delivered) {
        return Err(SettlementError::InvalidTransition {
            from: status,
            action: "confirm",
        });
    }

    let breakdown_sum = sum2([
        delivery.cash_amount,
        delivery.transfer_amount,
        delivery.check_amount,
        delivery.deposit_amount,
    ]);
    if let Some(corrected) = reconcile_amount(delivery.amount, breakdown_sum) {
        tracing::warn!(
            delivery_id = %delivery_id,
            stored = %delivery.amount,
            breakdown = %corrected,
            "Reconciled delivery amount to the method breakdown on confirm"
        );
        delivery.amount = corrected;
    }
    if !within_tolerance(declared_amount, delivery.amount) {
        tracing::warn!(
            delivery_id = %delivery_id,
            declared = %declared_amount,
            amount = %delivery.amount,
            "Declared delivered amount diverges from the reconciled total"
        );
    }

    delivery_repo::set_delivered(&mut tx, delivery_id, delivery.amount, declared_amount).await?;
    delivery.status = DeliveryStatus::Delivered.as_str().to_string();
    delivery.declared_amount = Some(declared_amount);

    let lines = delivery_repo::lines_tx(&mut tx, delivery_id).await?;
    tx.commit().await?;

    tracing::info!(delivery_id = %delivery_id, declared = %declared_amount, "Cash delivery confirmed");
    Ok(delivery_response(
        delivery,
        lines.iter().map(line_response).collect(),
    ))
}

/// Reject a PENDING delivery. Every underlying order/payment is released
/// back to unsettled; the line snapshots stay for audit.
pub async fn cancel(
    pool: &PgPool,
    delivery_id: Uuid,
    reason: &str,
) -> SettlementResult<DeliveryResponse> {
    validation::validate_reason(reason)?;
    let mut tx = pool.begin().await?;

    let mut delivery = lock_delivery(&mut tx, delivery_id).await?;
    let status = parse_status(&delivery.status)?;
    if !status.can_transition(DeliveryStatus::Rejected) {
        return Err(SettlementError::InvalidTransition {
            from: status,
            action: "cancel",
        });
    }

    let lines = delivery_repo::lines_tx(&mut tx, delivery_id).await?;
    release_sources(&mut tx, &lines).await?;
    delivery_repo::release_lines(&mut tx, delivery_id).await?;
    delivery_repo::set_rejected(&mut tx, delivery_id, reason).await?;
    delivery.status = DeliveryStatus::Rejected.as_str().to_string();
    delivery.rejection_reason = Some(reason.to_string());

    tx.commit().await?;

    tracing::info!(
        delivery_id = %delivery_id,
        released = lines.len(),
        reason = %reason,
        "Cash delivery rejected; sources released"
    );
    Ok(delivery_response(
        delivery,
        lines.iter().map(line_response).collect(),
    ))
}

/// Back-office audit: DELIVERED → VERIFIED.
pub async fn verify(pool: &PgPool, delivery_id: Uuid) -> SettlementResult<DeliveryResponse> {
    let mut tx = pool.begin().await?;

    let mut delivery = lock_delivery(&mut tx, delivery_id).await?;
    let status = parse_status(&delivery.status)?;
    if !status.can_transition(DeliveryStatus::Verified) {
        return Err(SettlementError::InvalidTransition {
            from: status,
            action: "verify",
        });
    }

    delivery_repo::set_verified(&mut tx, delivery_id).await?;
    delivery.status = DeliveryStatus::Verified.as_str().to_string();

    let lines = delivery_repo::lines_tx(&mut tx, delivery_id).await?;
    tx.commit().await?;

    tracing::info!(delivery_id = %delivery_id, "Cash delivery verified");
    Ok(delivery_response(
        delivery,
        lines.iter().map(line_response).collect(),
    ))
}

/// Delete a delivery while it is still PENDING, releasing all sources and
/// removing its lines.
pub async fn delete(pool: &PgPool, delivery_id: Uuid) -> SettlementResult<()> {
    let mut tx = pool.begin().await?;

    let delivery = lock_delivery(&mut tx, delivery_id).await?;
    let status = parse_status(&delivery.status)?;
    if status != DeliveryStatus::Pending {
        return Err(SettlementError::InvalidTransition {
            from: status,
            action: "delete",
        });
    }

    let lines = delivery_repo::lines_tx(&mut tx, delivery_id).await?;
    release_sources(&mut tx, &lines).await?;
    delivery_repo::delete_lines(&mut tx, delivery_id).await?;
    delivery_repo::delete(&mut tx, delivery_id).await?;

    tx.commit().await?;

    tracing::info!(
        delivery_id = %delivery_id,
        released = lines.len(),
        "Pending cash delivery deleted; sources released"
    );
    Ok(())
}

/// Read one delivery with its lines.
pub async fn get(pool: &PgPool, delivery_id: Uuid) -> SettlementResult<DeliveryResponse> {
    let delivery = delivery_repo::find(pool, delivery_id)
        .await?
        .ok_or(SettlementError::DeliveryNotFound(delivery_id))?;
    let lines = delivery_repo::lines(pool, delivery_id).await?;
    Ok(delivery_response(
        delivery,
        lines.iter().map(line_response).collect(),
    ))
}

/// Deliveries filtered by optional branch/employee and date window.
pub async fn list(
    pool: &PgPool,
    location_id: Option<Uuid>,
    employee_id: Option<Uuid>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> SettlementResult<Vec<DeliveryResponse>> {
    let deliveries = delivery_repo::list(pool, location_id, employee_id, from, to).await?;
    let mut responses = Vec::with_capacity(deliveries.len());
    for delivery in deliveries {
        let lines = delivery_repo::lines(pool, delivery.id).await?;
        responses.push(delivery_response(
            delivery,
            lines.iter().map(line_response).collect(),
        ));
    }
    Ok(responses)
}

async fn lock_delivery(
    tx: &mut Transaction<'_, Postgres>,
    delivery_id: Uuid,
) -> SettlementResult<CashDelivery> {
    delivery_repo::lock(tx, delivery_id)
        .await?
        .ok_or(SettlementError::DeliveryNotFound(delivery_id))
}

fn parse_status(status: &str) -> SettlementResult<DeliveryStatus> {
    DeliveryStatus::parse(status)
        .ok_or_else(|| SettlementError::UnknownStatus(status.to_string()))
}

/// Insert a line, translating the unique-source violation to a conflict.
async fn insert_line(
    tx: &mut Transaction<'_, Postgres>,
    line: &DeliveryLine,
) -> SettlementResult<()> {
    delivery_repo::insert_line(tx, line).await.map_err(|e| {
        if is_unique_violation(&e) {
            let kind = match SourceKind::parse(&line.source_kind) {
                Some(SourceKind::Payment) => "Payment",
                _ => "Order",
            };
            SettlementError::AlreadySettled {
                kind,
                id: line.source_id,
            }
        } else {
            SettlementError::Database(e)
        }
    })
}

/// Release the settled flags of every source behind the given lines.
async fn release_sources(
    tx: &mut Transaction<'_, Postgres>,
    lines: &[DeliveryLine],
) -> Result<(), sqlx::Error> {
    for line in lines {
        match SourceKind::parse(&line.source_kind) {
            Some(SourceKind::Payment) => {
                payment_repo::release_settled(tx, line.source_id).await?;
            }
            _ => {
                order_repo::release_settled(tx, line.source_id).await?;
            }
        }
    }
    Ok(())
}

fn line_response(line: &DeliveryLine) -> DeliveryLineResponse {
    DeliveryLineResponse {
        id: line.id,
        source_kind: SourceKind::parse(&line.source_kind).unwrap_or(SourceKind::Order),
        source_id: line.source_id,
        amount: line.amount,
        order_number: line.order_number.clone(),
        order_date: line.order_date,
        credit_sale: line.credit_sale,
        customer_name: line.customer_name.clone(),
    }
}

fn delivery_response(delivery: CashDelivery, lines: Vec<DeliveryLineResponse>) -> DeliveryResponse {
    let status = DeliveryStatus::parse(&delivery.status).unwrap_or(DeliveryStatus::Pending);
    DeliveryResponse {
        id: delivery.id,
        location_id: delivery.location_id,
        employee_id: delivery.employee_id,
        delivery_date: delivery.delivery_date,
        cash_amount: delivery.cash_amount,
        transfer_amount: delivery.transfer_amount,
        check_amount: delivery.check_amount,
        deposit_amount: delivery.deposit_amount,
        amount: delivery.amount,
        withholding_total: delivery.withholding_total,
        modality: delivery.modality,
        status,
        declared_amount: delivery.declared_amount,
        rejection_reason: delivery.rejection_reason,
        created_at: delivery.created_at,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn breakdown(cash: Decimal, transfer: Decimal, check: Decimal, deposit: Decimal) -> MethodBreakdown {
        MethodBreakdown {
            cash,
            transfer,
            check,
            deposit,
        }
    }

    #[test]
    fn test_amount_defaults_to_breakdown_sum() {
        let b = breakdown(dec!(100000), dec!(30000), dec!(20000), Decimal::ZERO);
        assert_eq!(resolve_declared_amount(&b, None), Ok(dec!(150000)));
    }

    #[test]
    fn test_declared_amount_must_match_breakdown() {
        let b = breakdown(dec!(100), dec!(50), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(
            resolve_declared_amount(&b, Some(dec!(140))),
            Err(ValidationError::BreakdownMismatch {
                declared: dec!(140),
                computed: dec!(150),
            })
        );
    }

    #[test]
    fn test_declared_amount_within_tolerance_is_accepted() {
        let b = breakdown(dec!(100), dec!(50), Decimal::ZERO, Decimal::ZERO);
        assert_eq!(resolve_declared_amount(&b, Some(dec!(150.01))), Ok(dec!(150.01)));
    }

    #[test]
    fn test_declared_amount_without_breakdown_is_taken_as_is() {
        let b = MethodBreakdown::default();
        assert_eq!(resolve_declared_amount(&b, Some(dec!(75.5))), Ok(dec!(75.50)));
    }

    #[test]
    fn test_reconcile_leaves_matching_amounts_alone() {
        assert_eq!(reconcile_amount(dec!(150000), dec!(150000)), None);
        assert_eq!(reconcile_amount(dec!(150000.00), dec!(150000.01)), None);
    }

    #[test]
    fn test_reconcile_corrects_to_breakdown_sum() {
        assert_eq!(
            reconcile_amount(dec!(150000), dec!(149000)),
            Some(dec!(149000))
        );
    }
}
