//! Refund contract types, shared between the sale and purchase variants.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a refund: `PENDING → {PROCESSED, VOIDED}`, both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundStatus {
    Pending,
    Processed,
    Voided,
}

impl RefundStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processed => "PROCESSED",
            Self::Voided => "VOIDED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(Self::Pending),
            "PROCESSED" => Some(Self::Processed),
            "VOIDED" => Some(Self::Voided),
            _ => None,
        }
    }
}

/// How a sale refund is returned to the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundMethod {
    Cash,
    Transfer,
    CreditNote,
    CreditAdjustment,
}

impl RefundMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cash => "CASH",
            Self::Transfer => "TRANSFER",
            Self::CreditNote => "CREDIT_NOTE",
            Self::CreditAdjustment => "CREDIT_ADJUSTMENT",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "CASH" => Some(Self::Cash),
            "TRANSFER" => Some(Self::Transfer),
            "CREDIT_NOTE" => Some(Self::CreditNote),
            "CREDIT_ADJUSTMENT" => Some(Self::CreditAdjustment),
            _ => None,
        }
    }
}

/// One requested refund line against an original order/purchase item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundLineRequest {
    /// The original order_item / purchase_item being returned
    pub item_id: Uuid,
    /// Must be > 0 and ≤ the item's remaining unrefunded quantity
    pub quantity: Decimal,
    /// Overrides the original unit price when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSaleRefundRequest {
    pub order_id: Uuid,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<RefundMethod>,
    /// Flat discount subtracted from the subtotal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    pub lines: Vec<RefundLineRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePurchaseRefundRequest {
    pub purchase_id: Uuid,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_date: Option<NaiveDate>,
    pub lines: Vec<RefundLineRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResponse {
    pub id: Uuid,
    /// The original order (sale refunds) or purchase (purchase refunds)
    pub document_id: Uuid,
    pub refund_date: NaiveDate,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<RefundMethod>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub status: RefundStatus,
    pub processed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    pub lines: Vec<RefundLineResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundLineResponse {
    pub id: Uuid,
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_subtotal: Decimal,
}
