//! Credit ledger routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::credits::{
    AssociateOrdersRequest, CreateCreditRequest, CreditResponse, RecomputeResponse,
};
use crate::routes::ApiError;
use crate::services::ledger_service::{self, LedgerError};

/// Map ledger errors to HTTP status codes
fn map_error(error: LedgerError) -> ApiError {
    let status = match &error {
        LedgerError::CreditNotFound(_)
        | LedgerError::CustomerNotFound(_)
        | LedgerError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::CrossCustomerOrder { .. } => StatusCode::BAD_REQUEST,
        LedgerError::CreditExists(_) | LedgerError::OrderAlreadyCharged(_) => {
            StatusCode::CONFLICT
        }
        LedgerError::Database(_) => {
            return ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    ApiError::new(status, error.to_string())
}

/// Handler for POST /api/credits
pub async fn create_credit(
    State(pool): State<Arc<PgPool>>,
    Json(request): Json<CreateCreditRequest>,
) -> Result<(StatusCode, Json<CreditResponse>), ApiError> {
    let credit = ledger_service::create(&pool, request.customer_id, &request.order_ids)
        .await
        .map_err(map_error)?;
    Ok((StatusCode::CREATED, Json(credit)))
}

/// Handler for GET /api/credits/{credit_id}
pub async fn get_credit(
    State(pool): State<Arc<PgPool>>,
    Path(credit_id): Path<Uuid>,
) -> Result<Json<CreditResponse>, ApiError> {
    let credit = ledger_service::get(&pool, credit_id)
        .await
        .map_err(map_error)?;
    Ok(Json(credit))
}

/// Handler for POST /api/credits/{credit_id}/recompute
pub async fn recompute_credit(
    State(pool): State<Arc<PgPool>>,
    Path(credit_id): Path<Uuid>,
) -> Result<Json<RecomputeResponse>, ApiError> {
    let debt = ledger_service::recompute(&pool, credit_id)
        .await
        .map_err(map_error)?;
    Ok(Json(RecomputeResponse { credit_id, debt }))
}

/// Handler for POST /api/credits/{credit_id}/orders
pub async fn associate_orders(
    State(pool): State<Arc<PgPool>>,
    Path(credit_id): Path<Uuid>,
    Json(request): Json<AssociateOrdersRequest>,
) -> Result<Json<RecomputeResponse>, ApiError> {
    let debt = ledger_service::associate_orders(&pool, credit_id, &request.order_ids)
        .await
        .map_err(map_error)?;
    Ok(Json(RecomputeResponse { credit_id, debt }))
}

/// Handler for DELETE /api/credits/{credit_id}/orders/{order_id}
pub async fn remove_order(
    State(pool): State<Arc<PgPool>>,
    Path((credit_id, order_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<RecomputeResponse>, ApiError> {
    let debt = ledger_service::remove_order(&pool, credit_id, order_id)
        .await
        .map_err(map_error)?;
    Ok(Json(RecomputeResponse { credit_id, debt }))
}
