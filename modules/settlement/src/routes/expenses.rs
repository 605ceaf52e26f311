//! Branch expense routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::expenses::{
    CreateExpenseRequest, ExpenseResponse, ExpenseTotalResponse, UpdateExpenseRequest,
};
use crate::routes::ApiError;
use crate::services::expense_service::{self, ExpenseError};

/// Map expense errors to HTTP status codes
fn map_error(error: ExpenseError) -> ApiError {
    let status = match &error {
        ExpenseError::ExpenseNotFound(_)
        | ExpenseError::LocationNotFound(_)
        | ExpenseError::DeliveryNotFound(_)
        | ExpenseError::EmployeeNotFound(_)
        | ExpenseError::SupplierNotFound(_) => StatusCode::NOT_FOUND,
        ExpenseError::Validation(_) => StatusCode::BAD_REQUEST,
        ExpenseError::Database(_) => {
            return ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    ApiError::new(status, error.to_string())
}

/// Query for GET /api/expenses and /api/expenses/total
#[derive(Debug, Deserialize)]
pub struct ExpensePeriodQuery {
    pub location_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Query for GET /api/expenses/unattached
#[derive(Debug, Deserialize)]
pub struct UnattachedQuery {
    pub location_id: Uuid,
}

/// Handler for GET /api/expenses
pub async fn list_expenses(
    State(pool): State<Arc<PgPool>>,
    Query(query): Query<ExpensePeriodQuery>,
) -> Result<Json<Vec<ExpenseResponse>>, ApiError> {
    let expenses = expense_service::list(&pool, query.location_id, query.from, query.to)
        .await
        .map_err(map_error)?;
    Ok(Json(expenses))
}

/// Handler for GET /api/expenses/unattached
pub async fn list_unattached(
    State(pool): State<Arc<PgPool>>,
    Query(query): Query<UnattachedQuery>,
) -> Result<Json<Vec<ExpenseResponse>>, ApiError> {
    let expenses = expense_service::list_unattached(&pool, query.location_id)
        .await
        .map_err(map_error)?;
    Ok(Json(expenses))
}

/// Handler for GET /api/expenses/total
pub async fn expense_total(
    State(pool): State<Arc<PgPool>>,
    Query(query): Query<ExpensePeriodQuery>,
) -> Result<Json<ExpenseTotalResponse>, ApiError> {
    let total =
        expense_service::total_for_location(&pool, query.location_id, query.from, query.to)
            .await
            .map_err(map_error)?;
    Ok(Json(ExpenseTotalResponse {
        location_id: query.location_id,
        from: query.from,
        to: query.to,
        total,
    }))
}

/// Handler for POST /api/expenses
pub async fn create_expense(
    State(pool): State<Arc<PgPool>>,
    Json(request): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    let expense = expense_service::create(&pool, request)
        .await
        .map_err(map_error)?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// Handler for PUT /api/expenses/{expense_id}
pub async fn update_expense(
    State(pool): State<Arc<PgPool>>,
    Path(expense_id): Path<Uuid>,
    Json(request): Json<UpdateExpenseRequest>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let expense = expense_service::update(&pool, expense_id, request)
        .await
        .map_err(map_error)?;
    Ok(Json(expense))
}

/// Handler for POST /api/expenses/{expense_id}/approve
pub async fn approve_expense(
    State(pool): State<Arc<PgPool>>,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let expense = expense_service::set_approved(&pool, expense_id, true)
        .await
        .map_err(map_error)?;
    Ok(Json(expense))
}

/// Handler for POST /api/expenses/{expense_id}/reject
pub async fn reject_expense(
    State(pool): State<Arc<PgPool>>,
    Path(expense_id): Path<Uuid>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let expense = expense_service::set_approved(&pool, expense_id, false)
        .await
        .map_err(map_error)?;
    Ok(Json(expense))
}

/// Handler for DELETE /api/expenses/{expense_id}
pub async fn delete_expense(
    State(pool): State<Arc<PgPool>>,
    Path(expense_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    expense_service::delete(&pool, expense_id)
        .await
        .map_err(map_error)?;
    Ok(StatusCode::NO_CONTENT)
}
