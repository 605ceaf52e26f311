//! Cash delivery contract types, including the delivery state machine.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a cash delivery.
///
/// `PENDING → {DELIVERED, REJECTED}`; `DELIVERED → VERIFIED`.
/// `VERIFIED` and `REJECTED` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Rejected,
    Verified,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Delivered => "DELIVERED",
            Self::Rejected => "REJECTED",
            Self::Verified => "VERIFIED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "DELIVERED" => Some(Self::Delivered),
            "REJECTED" => Some(Self::Rejected),
            "VERIFIED" => Some(Self::Verified),
            _ => None,
        }
    }

    /// Whether the state machine permits moving from `self` to `target`.
    pub fn can_transition(&self, target: DeliveryStatus) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Delivered)
                | (Self::Pending, Self::Rejected)
                | (Self::Delivered, Self::Verified)
        )
    }
}

/// Which kind of source record a delivery line snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Order,
    Payment,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Order => "ORDER",
            Self::Payment => "PAYMENT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ORDER" => Some(Self::Order),
            "PAYMENT" => Some(Self::Payment),
            _ => None,
        }
    }
}

/// Request to batch collected receipts into a delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDeliveryRequest {
    pub location_id: Uuid,
    pub employee_id: Uuid,

    /// Defaults to today when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<NaiveDate>,

    /// Delivery modality ("en mano", "consignación", ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,

    /// Declared aggregate; when present it must match the breakdown sum
    /// within 0.01. Recomputed from the attached lines either way.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,

    /// Payment-method breakdown; defaults to all-cash when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<Decimal>,

    /// Unsettled cash-sale orders to include
    #[serde(default)]
    pub order_ids: Vec<Uuid>,

    /// Unsettled credit payments to include
    #[serde(default)]
    pub payment_ids: Vec<Uuid>,
}

/// Confirmation payload: what the employee physically handed over
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmDeliveryRequest {
    pub declared_amount: Decimal,
}

/// Cancellation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelDeliveryRequest {
    pub reason: String,
}

/// A cash delivery with its frozen line snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub location_id: Uuid,
    pub employee_id: Uuid,
    pub delivery_date: NaiveDate,
    pub cash_amount: Decimal,
    pub transfer_amount: Decimal,
    pub check_amount: Decimal,
    pub deposit_amount: Decimal,
    pub amount: Decimal,
    pub withholding_total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
    pub status: DeliveryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<DeliveryLineResponse>,
}

/// Frozen snapshot of one settled order or payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryLineResponse {
    pub id: Uuid,
    pub source_kind: SourceKind,
    pub source_id: Uuid,
    pub amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_date: Option<NaiveDate>,
    pub credit_sale: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
}

/// Unsettled receipts eligible for a future delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleableResponse {
    pub orders: Vec<SettleableOrder>,
    pub payments: Vec<SettleablePayment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleableOrder {
    pub id: Uuid,
    pub number: String,
    pub order_date: NaiveDate,
    pub total: Decimal,
    pub customer_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleablePayment {
    pub id: Uuid,
    pub paid_on: NaiveDate,
    pub amount: Decimal,
    pub withholding_amount: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    pub customer_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_can_be_delivered_or_rejected() {
        assert!(DeliveryStatus::Pending.can_transition(DeliveryStatus::Delivered));
        assert!(DeliveryStatus::Pending.can_transition(DeliveryStatus::Rejected));
        assert!(!DeliveryStatus::Pending.can_transition(DeliveryStatus::Verified));
    }

    #[test]
    fn test_delivered_can_only_be_verified() {
        assert!(DeliveryStatus::Delivered.can_transition(DeliveryStatus::Verified));
        assert!(!DeliveryStatus::Delivered.can_transition(DeliveryStatus::Rejected));
        assert!(!DeliveryStatus::Delivered.can_transition(DeliveryStatus::Pending));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for target in [
            DeliveryStatus::Pending,
            DeliveryStatus::Delivered,
            DeliveryStatus::Rejected,
            DeliveryStatus::Verified,
        ] {
            assert!(!DeliveryStatus::Rejected.can_transition(target));
            assert!(!DeliveryStatus::Verified.can_transition(target));
        }
    }

    #[test]
    fn test_status_round_trips_through_storage_form() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::Delivered,
            DeliveryStatus::Rejected,
            DeliveryStatus::Verified,
        ] {
            assert_eq!(DeliveryStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DeliveryStatus::parse("SHIPPED"), None);
    }
}
