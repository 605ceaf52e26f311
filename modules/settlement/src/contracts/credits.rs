//! Credit ledger contract types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to open a credit for a customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCreditRequest {
    pub customer_id: Uuid,
    /// Orders to charge to the credit immediately
    #[serde(default)]
    pub order_ids: Vec<Uuid>,
}

/// Request to associate one or more credit orders with a credit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociateOrdersRequest {
    /// Orders to add to the credit's association set
    pub order_ids: Vec<Uuid>,
}

/// A credit with its associated orders and chronological payment list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub customer_name: String,
    /// Outstanding debt: round2(Σ order totals) − round2(Σ payments), ≥ 0
    pub debt: Decimal,
    pub is_closed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
    pub orders: Vec<CreditOrder>,
    pub payments: Vec<crate::contracts::payments::PaymentResponse>,
}

/// One order charged to a credit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditOrder {
    pub order_id: Uuid,
    pub number: String,
    pub order_date: NaiveDate,
    pub total: Decimal,
}

/// Result of an explicit ledger recompute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecomputeResponse {
    pub credit_id: Uuid,
    pub debt: Decimal,
}
