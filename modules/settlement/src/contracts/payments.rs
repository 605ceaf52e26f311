//! Payment (abono) contract types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to record a payment against a credit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePaymentRequest {
    /// Collected amount; must be > 0 and ≤ the credit's outstanding debt
    pub amount: Decimal,

    /// Branch where the payment was collected
    pub location_id: Uuid,

    /// Field employee who collected it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector_id: Option<Uuid>,

    /// Defaults to today when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_on: Option<NaiveDate>,

    /// Free-form payment-method description ("efectivo", "transfer BCP #123")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    /// Optional link to a specific order of the same customer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,

    /// Informational breakdown; need not sum to `amount`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_amount: Option<Decimal>,

    /// Withholding tax; informational, excluded from settlement arithmetic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withholding_amount: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
}

/// Request to edit a payment in place; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePaymentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withholding_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
}

/// A recorded payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub credit_id: Uuid,
    pub location_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collector_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    pub paid_on: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    pub cash_amount: Decimal,
    pub transfer_amount: Decimal,
    pub check_amount: Decimal,
    pub withholding_amount: Decimal,
    pub amount: Decimal,
    /// Credit debt immediately after this payment was applied
    pub balance_after: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
    pub is_settled: bool,
    pub created_at: DateTime<Utc>,
}
