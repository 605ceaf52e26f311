//! Branch expense contract types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Expense category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseCategory {
    Operational,
    Maintenance,
    Fuel,
    Utilities,
    Emergency,
    Food,
    Other,
}

impl ExpenseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operational => "OPERATIONAL",
            Self::Maintenance => "MAINTENANCE",
            Self::Fuel => "FUEL",
            Self::Utilities => "UTILITIES",
            Self::Emergency => "EMERGENCY",
            Self::Food => "FOOD",
            Self::Other => "OTHER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPERATIONAL" => Some(Self::Operational),
            "MAINTENANCE" => Some(Self::Maintenance),
            "FUEL" => Some(Self::Fuel),
            "UTILITIES" => Some(Self::Utilities),
            "EMERGENCY" => Some(Self::Emergency),
            "FOOD" => Some(Self::Food),
            "OTHER" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateExpenseRequest {
    pub location_id: Uuid,
    pub amount: Decimal,
    pub concept: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ExpenseCategory>,
    /// Defaults to today when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent_on: Option<NaiveDate>,
    /// Attaching to a delivery offsets that delivery's net cash owed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
}

/// Absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateExpenseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ExpenseCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spent_on: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseResponse {
    pub id: Uuid,
    pub location_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub employee_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<Uuid>,
    pub spent_on: NaiveDate,
    pub amount: Decimal,
    pub concept: String,
    pub category: ExpenseCategory,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate expense total for a branch over a period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseTotalResponse {
    pub location_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total: Decimal,
}
