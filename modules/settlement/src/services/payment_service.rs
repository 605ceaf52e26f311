//! Payment recorder service
//!
//! Creates, edits and deletes individual payments (abonos) against a
//! credit, enforcing the overpayment and ownership rules, and triggers the
//! ledger recompute after every mutation. All paths lock the credit row
//! first; the overpayment check reads the locked debt.

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::contracts::payments::{
    CreatePaymentRequest, PaymentResponse, UpdatePaymentRequest,
};
use crate::money::round2;
use crate::repos::payment_repo::Payment;
use crate::repos::{credit_repo, directory_repo, order_repo, payment_repo};
use crate::services::ledger_service;
use crate::validation::{self, ValidationError};

/// Errors that can occur while recording payments
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Credit not found: {0}")]
    CreditNotFound(Uuid),

    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    #[error("Payment {payment_id} does not belong to credit {credit_id}")]
    PaymentNotOnCredit { payment_id: Uuid, credit_id: Uuid },

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Order {order_id} does not belong to customer {customer_id}")]
    CrossCustomerOrder { order_id: Uuid, customer_id: Uuid },

    #[error("Location not found: {0}")]
    LocationNotFound(Uuid),

    #[error("Employee not found: {0}")]
    EmployeeNotFound(Uuid),

    #[error("Payment of {amount} exceeds outstanding balance of {balance}")]
    ExceedsBalance { amount: Decimal, balance: Decimal },

    #[error("Payment {0} is already settled in a cash delivery")]
    SettledPayment(Uuid),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

/// Record a payment against a credit.
///
/// The amount must be positive and must not exceed the credit's debt at the
/// moment of the (locked) read; the stored `balance_after` snapshot is the
/// debt immediately after this payment.
pub async fn create(
    pool: &PgPool,
    credit_id: Uuid,
    req: CreatePaymentRequest,
) -> PaymentResult<PaymentResponse> {
    let amount = round2(req.amount);
    validation::validate_positive_amount(amount)?;

    let withholding = round2(req.withholding_amount.unwrap_or(Decimal::ZERO));
    validation::validate_non_negative_amount(withholding)?;

    let mut tx = pool.begin().await?;

    let credit = credit_repo::lock(&mut tx, credit_id)
        .await?
        .ok_or(PaymentError::CreditNotFound(credit_id))?;

    if !directory_repo::location_exists(&mut tx, req.location_id).await? {
        return Err(PaymentError::LocationNotFound(req.location_id));
    }
    if let Some(collector_id) = req.collector_id {
        if !directory_repo::employee_exists(&mut tx, collector_id).await? {
            return Err(PaymentError::EmployeeNotFound(collector_id));
        }
    }

    // Cross-customer misattribution guard on the optional order link
    let order_number = match req.order_id {
        Some(order_id) => {
            let order = order_repo::find_tx(&mut tx, order_id)
                .await?
                .ok_or(PaymentError::OrderNotFound(order_id))?;
            if order.customer_id != credit.customer_id {
                return Err(PaymentError::CrossCustomerOrder {
                    order_id,
                    customer_id: credit.customer_id,
                });
            }
            Some(order.number)
        }
        None => None,
    };

    let balance = credit.debt;
    if amount > balance {
        return Err(PaymentError::ExceedsBalance { amount, balance });
    }

    let now = Utc::now();
    let payment = Payment {
        id: Uuid::new_v4(),
        credit_id,
        location_id: req.location_id,
        collector_id: req.collector_id,
        order_id: req.order_id,
        order_number,
        paid_on: req.paid_on.unwrap_or_else(|| now.date_naive()),
        method: req.method,
        cash_amount: round2(req.cash_amount.unwrap_or(Decimal::ZERO)),
        transfer_amount: round2(req.transfer_amount.unwrap_or(Decimal::ZERO)),
        check_amount: round2(req.check_amount.unwrap_or(Decimal::ZERO)),
        withholding_amount: withholding,
        amount,
        balance_after: round2(balance - amount),
        receipt_ref: req.receipt_ref,
        is_settled: false,
        created_at: now,
        updated_at: now,
    };

    payment_repo::insert(&mut tx, &payment).await?;
    let debt = ledger_service::recompute_locked(&mut tx, credit_id).await?;
    tx.commit().await?;

    tracing::info!(
        payment_id = %payment.id,
        credit_id = %credit_id,
        amount = %amount,
        balance_after = %payment.balance_after,
        debt = %debt,
        "Payment recorded"
    );

    Ok(payment_response(payment))
}

/// Edit a payment in place and recompute the ledger.
///
/// The snapshot is rewritten to the post-recompute debt: after an edit the
/// `balance_after` of this payment reflects the credit's current state, not
/// the historical value at original creation. Documented behavior.
pub async fn update(
    pool: &PgPool,
    credit_id: Uuid,
    payment_id: Uuid,
    req: UpdatePaymentRequest,
) -> PaymentResult<PaymentResponse> {
    let mut tx = pool.begin().await?;

    let credit = credit_repo::lock(&mut tx, credit_id)
        .await?
        .ok_or(PaymentError::CreditNotFound(credit_id))?;

    let mut payment = payment_repo::find_tx(&mut tx, payment_id)
        .await?
        .ok_or(PaymentError::PaymentNotFound(payment_id))?;

    if payment.credit_id != credit_id {
        return Err(PaymentError::PaymentNotOnCredit {
            payment_id,
            credit_id,
        });
    }

    if let Some(amount) = req.amount {
        let amount = round2(amount);
        validation::validate_positive_amount(amount)?;
        payment.amount = amount;
    }
    if let Some(paid_on) = req.paid_on {
        payment.paid_on = paid_on;
    }
    if let Some(method) = req.method {
        payment.method = Some(method);
    }
    if let Some(order_id) = req.order_id {
        let order = order_repo::find_tx(&mut tx, order_id)
            .await?
            .ok_or(PaymentError::OrderNotFound(order_id))?;
        if order.customer_id != credit.customer_id {
            return Err(PaymentError::CrossCustomerOrder {
                order_id,
                customer_id: credit.customer_id,
            });
        }
        payment.order_id = Some(order_id);
        payment.order_number = Some(order.number);
    }
    if let Some(cash) = req.cash_amount {
        validation::validate_non_negative_amount(cash)?;
        payment.cash_amount = round2(cash);
    }
    if let Some(transfer) = req.transfer_amount {
        validation::validate_non_negative_amount(transfer)?;
        payment.transfer_amount = round2(transfer);
    }
    if let Some(check) = req.check_amount {
        validation::validate_non_negative_amount(check)?;
        payment.check_amount = round2(check);
    }
    if let Some(withholding) = req.withholding_amount {
        validation::validate_non_negative_amount(withholding)?;
        payment.withholding_amount = round2(withholding);
    }
    if let Some(receipt_ref) = req.receipt_ref {
        payment.receipt_ref = Some(receipt_ref);
    }

    payment_repo::update(&mut tx, &payment).await?;

    let debt = ledger_service::recompute_locked(&mut tx, credit_id).await?;
    payment_repo::set_balance_after(&mut tx, payment_id, debt).await?;
    payment.balance_after = debt;

    tx.commit().await?;

    tracing::info!(
        payment_id = %payment_id,
        credit_id = %credit_id,
        amount = %payment.amount,
        debt = %debt,
        "Payment updated"
    );

    Ok(payment_response(payment))
}

/// Hard-delete a payment and recompute the ledger. A payment frozen inside
/// a cash delivery cannot be deleted.
pub async fn delete(pool: &PgPool, credit_id: Uuid, payment_id: Uuid) -> PaymentResult<()> {
    let mut tx = pool.begin().await?;

    credit_repo::lock(&mut tx, credit_id)
        .await?
        .ok_or(PaymentError::CreditNotFound(credit_id))?;

    let payment = payment_repo::find_tx(&mut tx, payment_id)
        .await?
        .ok_or(PaymentError::PaymentNotFound(payment_id))?;

    if payment.credit_id != credit_id {
        return Err(PaymentError::PaymentNotOnCredit {
            payment_id,
            credit_id,
        });
    }
    if payment.is_settled {
        return Err(PaymentError::SettledPayment(payment_id));
    }

    payment_repo::delete(&mut tx, payment_id).await?;
    let debt = ledger_service::recompute_locked(&mut tx, credit_id).await?;
    tx.commit().await?;

    tracing::info!(
        payment_id = %payment_id,
        credit_id = %credit_id,
        debt = %debt,
        "Payment deleted"
    );
    Ok(())
}

/// Chronological payment list for a credit.
pub async fn list(pool: &PgPool, credit_id: Uuid) -> PaymentResult<Vec<PaymentResponse>> {
    if credit_repo::find(pool, credit_id).await?.is_none() {
        return Err(PaymentError::CreditNotFound(credit_id));
    }
    Ok(payment_repo::list_for_credit(pool, credit_id)
        .await?
        .into_iter()
        .map(payment_response)
        .collect())
}

/// Map a payment row to its response contract
pub(crate) fn payment_response(p: Payment) -> PaymentResponse {
    PaymentResponse {
        id: p.id,
        credit_id: p.credit_id,
        location_id: p.location_id,
        collector_id: p.collector_id,
        order_id: p.order_id,
        order_number: p.order_number,
        paid_on: p.paid_on,
        method: p.method,
        cash_amount: p.cash_amount,
        transfer_amount: p.transfer_amount,
        check_amount: p.check_amount,
        withholding_amount: p.withholding_amount,
        amount: p.amount,
        balance_after: p.balance_after,
        receipt_ref: p.receipt_ref,
        is_settled: p.is_settled,
        created_at: p.created_at,
    }
}
