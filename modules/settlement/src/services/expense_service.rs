//! Expense tracker service
//!
//! Records branch expenses that may optionally offset a cash delivery's
//! net amount. Expenses default to approved; no approval workflow blocks
//! their use.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::contracts::expenses::{
    CreateExpenseRequest, ExpenseCategory, ExpenseResponse, UpdateExpenseRequest,
};
use crate::money::round2;
use crate::repos::expense_repo::Expense;
use crate::repos::{delivery_repo, directory_repo, expense_repo};
use crate::validation::{self, ValidationError};

/// Errors that can occur while tracking expenses
#[derive(Debug, thiserror::Error)]
pub enum ExpenseError {
    #[error("Expense not found: {0}")]
    ExpenseNotFound(Uuid),

    #[error("Location not found: {0}")]
    LocationNotFound(Uuid),

    #[error("Delivery not found: {0}")]
    DeliveryNotFound(Uuid),

    #[error("Employee not found: {0}")]
    EmployeeNotFound(Uuid),

    #[error("Supplier not found: {0}")]
    SupplierNotFound(Uuid),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for expense operations
pub type ExpenseResult<T> = Result<T, ExpenseError>;

/// Record a branch expense. `approved` defaults to true and `spent_on` to
/// today when absent.
pub async fn create(pool: &PgPool, req: CreateExpenseRequest) -> ExpenseResult<ExpenseResponse> {
    let amount = round2(req.amount);
    validation::validate_positive_amount(amount)?;
    validation::validate_concept(&req.concept)?;

    let mut tx = pool.begin().await?;

    if !directory_repo::location_exists(&mut tx, req.location_id).await? {
        return Err(ExpenseError::LocationNotFound(req.location_id));
    }
    if let Some(delivery_id) = req.delivery_id {
        if !delivery_repo::exists_tx(&mut tx, delivery_id).await? {
            return Err(ExpenseError::DeliveryNotFound(delivery_id));
        }
    }
    if let Some(employee_id) = req.employee_id {
        if !directory_repo::employee_exists(&mut tx, employee_id).await? {
            return Err(ExpenseError::EmployeeNotFound(employee_id));
        }
    }
    if let Some(supplier_id) = req.supplier_id {
        if !directory_repo::supplier_exists(&mut tx, supplier_id).await? {
            return Err(ExpenseError::SupplierNotFound(supplier_id));
        }
    }

    let now = Utc::now();
    let expense = Expense {
        id: Uuid::new_v4(),
        location_id: req.location_id,
        delivery_id: req.delivery_id,
        employee_id: req.employee_id,
        supplier_id: req.supplier_id,
        spent_on: req.spent_on.unwrap_or_else(|| now.date_naive()),
        amount,
        concept: req.concept,
        category: req
            .category
            .unwrap_or(ExpenseCategory::Other)
            .as_str()
            .to_string(),
        approved: true,
        receipt_ref: req.receipt_ref,
        created_at: now,
    };

    expense_repo::insert(&mut tx, &expense).await?;
    tx.commit().await?;

    tracing::info!(
        expense_id = %expense.id,
        location_id = %expense.location_id,
        amount = %amount,
        category = %expense.category,
        "Expense recorded"
    );
    Ok(expense_response(expense))
}

/// Edit an expense in place; absent fields are left unchanged.
pub async fn update(
    pool: &PgPool,
    expense_id: Uuid,
    req: UpdateExpenseRequest,
) -> ExpenseResult<ExpenseResponse> {
    let mut tx = pool.begin().await?;

    let mut expense = expense_repo::find_tx(&mut tx, expense_id)
        .await?
        .ok_or(ExpenseError::ExpenseNotFound(expense_id))?;

    if let Some(amount) = req.amount {
        let amount = round2(amount);
        validation::validate_positive_amount(amount)?;
        expense.amount = amount;
    }
    if let Some(concept) = req.concept {
        validation::validate_concept(&concept)?;
        expense.concept = concept;
    }
    if let Some(category) = req.category {
        expense.category = category.as_str().to_string();
    }
    if let Some(spent_on) = req.spent_on {
        expense.spent_on = spent_on;
    }
    if let Some(delivery_id) = req.delivery_id {
        if !delivery_repo::exists_tx(&mut tx, delivery_id).await? {
            return Err(ExpenseError::DeliveryNotFound(delivery_id));
        }
        expense.delivery_id = Some(delivery_id);
    }
    if let Some(receipt_ref) = req.receipt_ref {
        expense.receipt_ref = Some(receipt_ref);
    }

    expense_repo::update(&mut tx, &expense).await?;
    tx.commit().await?;

    tracing::info!(expense_id = %expense_id, "Expense updated");
    Ok(expense_response(expense))
}

/// Flip the approval flag.
pub async fn set_approved(
    pool: &PgPool,
    expense_id: Uuid,
    approved: bool,
) -> ExpenseResult<ExpenseResponse> {
    let mut tx = pool.begin().await?;

    let updated = expense_repo::set_approved(&mut tx, expense_id, approved).await?;
    if updated == 0 {
        return Err(ExpenseError::ExpenseNotFound(expense_id));
    }
    tx.commit().await?;

    let expense = expense_repo::find(pool, expense_id)
        .await?
        .ok_or(ExpenseError::ExpenseNotFound(expense_id))?;

    tracing::info!(expense_id = %expense_id, approved, "Expense approval updated");
    Ok(expense_response(expense))
}

pub async fn delete(pool: &PgPool, expense_id: Uuid) -> ExpenseResult<()> {
    let mut tx = pool.begin().await?;

    let deleted = expense_repo::delete(&mut tx, expense_id).await?;
    if deleted == 0 {
        return Err(ExpenseError::ExpenseNotFound(expense_id));
    }
    tx.commit().await?;

    tracing::info!(expense_id = %expense_id, "Expense deleted");
    Ok(())
}

/// Branch expenses in a date window.
pub async fn list(
    pool: &PgPool,
    location_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> ExpenseResult<Vec<ExpenseResponse>> {
    Ok(expense_repo::list(pool, location_id, from, to)
        .await?
        .into_iter()
        .map(expense_response)
        .collect())
}

/// Expenses eligible to offset a future delivery.
pub async fn list_unattached(
    pool: &PgPool,
    location_id: Uuid,
) -> ExpenseResult<Vec<ExpenseResponse>> {
    Ok(expense_repo::list_unattached(pool, location_id)
        .await?
        .into_iter()
        .map(expense_response)
        .collect())
}

/// 2-dp expense total for a branch over a period.
pub async fn total_for_location(
    pool: &PgPool,
    location_id: Uuid,
    from: NaiveDate,
    to: NaiveDate,
) -> ExpenseResult<Decimal> {
    let total = expense_repo::total_in_period(pool, location_id, from, to).await?;
    Ok(round2(total))
}

fn expense_response(e: Expense) -> ExpenseResponse {
    ExpenseResponse {
        id: e.id,
        location_id: e.location_id,
        delivery_id: e.delivery_id,
        employee_id: e.employee_id,
        supplier_id: e.supplier_id,
        spent_on: e.spent_on,
        amount: e.amount,
        concept: e.concept,
        category: ExpenseCategory::parse(&e.category).unwrap_or(ExpenseCategory::Other),
        approved: e.approved,
        receipt_ref: e.receipt_ref,
        created_at: e.created_at,
    }
}
