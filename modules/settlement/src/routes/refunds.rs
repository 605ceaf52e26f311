//! Sale and purchase refund routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::refunds::{
    CreatePurchaseRefundRequest, CreateSaleRefundRequest, RefundResponse,
};
use crate::repos::refund_repo::RefundKind;
use crate::routes::ApiError;
use crate::services::refund_service::{self, NewRefund, RefundError};

/// Map refund errors to HTTP status codes
fn map_error(error: RefundError) -> ApiError {
    let status = match &error {
        RefundError::RefundNotFound { .. }
        | RefundError::DocumentNotFound { .. }
        | RefundError::ItemNotFound(_) => StatusCode::NOT_FOUND,
        RefundError::ForeignItem { .. }
        | RefundError::ExceedsRefundable { .. }
        | RefundError::Validation(_) => StatusCode::BAD_REQUEST,
        RefundError::DocumentVoided { .. }
        | RefundError::AlreadyProcessed(_)
        | RefundError::RefundVoided(_) => StatusCode::CONFLICT,
        RefundError::Database(_) => {
            return ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    ApiError::new(status, error.to_string())
}

/// Query for GET /api/refunds/sales
#[derive(Debug, Deserialize)]
pub struct SaleRefundsQuery {
    pub order_id: Uuid,
}

/// Query for GET /api/refunds/purchases
#[derive(Debug, Deserialize)]
pub struct PurchaseRefundsQuery {
    pub purchase_id: Uuid,
}

/// Handler for GET /api/refunds/sales
pub async fn list_sale_refunds(
    State(pool): State<Arc<PgPool>>,
    Query(query): Query<SaleRefundsQuery>,
) -> Result<Json<Vec<RefundResponse>>, ApiError> {
    let refunds = refund_service::list_for_document(&pool, RefundKind::Sale, query.order_id)
        .await
        .map_err(map_error)?;
    Ok(Json(refunds))
}

/// Handler for POST /api/refunds/sales
pub async fn create_sale_refund(
    State(pool): State<Arc<PgPool>>,
    Json(request): Json<CreateSaleRefundRequest>,
) -> Result<(StatusCode, Json<RefundResponse>), ApiError> {
    let refund = refund_service::create(
        &pool,
        RefundKind::Sale,
        NewRefund {
            document_id: request.order_id,
            reason: request.reason,
            refund_date: request.refund_date,
            method: request.method,
            discount: request.discount,
            lines: request.lines,
        },
    )
    .await
    .map_err(map_error)?;
    Ok((StatusCode::CREATED, Json(refund)))
}

/// Handler for GET /api/refunds/sales/{refund_id}
pub async fn get_sale_refund(
    State(pool): State<Arc<PgPool>>,
    Path(refund_id): Path<Uuid>,
) -> Result<Json<RefundResponse>, ApiError> {
    let refund = refund_service::get(&pool, RefundKind::Sale, refund_id)
        .await
        .map_err(map_error)?;
    Ok(Json(refund))
}

/// Handler for POST /api/refunds/sales/{refund_id}/process
pub async fn process_sale_refund(
    State(pool): State<Arc<PgPool>>,
    Path(refund_id): Path<Uuid>,
) -> Result<Json<RefundResponse>, ApiError> {
    let refund = refund_service::process(&pool, RefundKind::Sale, refund_id)
        .await
        .map_err(map_error)?;
    Ok(Json(refund))
}

/// Handler for POST /api/refunds/sales/{refund_id}/void
pub async fn void_sale_refund(
    State(pool): State<Arc<PgPool>>,
    Path(refund_id): Path<Uuid>,
) -> Result<Json<RefundResponse>, ApiError> {
    let refund = refund_service::void(&pool, RefundKind::Sale, refund_id)
        .await
        .map_err(map_error)?;
    Ok(Json(refund))
}

/// Handler for DELETE /api/refunds/sales/{refund_id}
pub async fn delete_sale_refund(
    State(pool): State<Arc<PgPool>>,
    Path(refund_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    refund_service::delete(&pool, RefundKind::Sale, refund_id)
        .await
        .map_err(map_error)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for GET /api/refunds/purchases
pub async fn list_purchase_refunds(
    State(pool): State<Arc<PgPool>>,
    Query(query): Query<PurchaseRefundsQuery>,
) -> Result<Json<Vec<RefundResponse>>, ApiError> {
    let refunds =
        refund_service::list_for_document(&pool, RefundKind::Purchase, query.purchase_id)
            .await
            .map_err(map_error)?;
    Ok(Json(refunds))
}

/// Handler for POST /api/refunds/purchases
pub async fn create_purchase_refund(
    State(pool): State<Arc<PgPool>>,
    Json(request): Json<CreatePurchaseRefundRequest>,
) -> Result<(StatusCode, Json<RefundResponse>), ApiError> {
    let refund = refund_service::create(
        &pool,
        RefundKind::Purchase,
        NewRefund {
            document_id: request.purchase_id,
            reason: request.reason,
            refund_date: request.refund_date,
            method: None,
            discount: None,
            lines: request.lines,
        },
    )
    .await
    .map_err(map_error)?;
    Ok((StatusCode::CREATED, Json(refund)))
}

/// Handler for GET /api/refunds/purchases/{refund_id}
pub async fn get_purchase_refund(
    State(pool): State<Arc<PgPool>>,
    Path(refund_id): Path<Uuid>,
) -> Result<Json<RefundResponse>, ApiError> {
    let refund = refund_service::get(&pool, RefundKind::Purchase, refund_id)
        .await
        .map_err(map_error)?;
    Ok(Json(refund))
}

/// Handler for POST /api/refunds/purchases/{refund_id}/process
pub async fn process_purchase_refund(
    State(pool): State<Arc<PgPool>>,
    Path(refund_id): Path<Uuid>,
) -> Result<Json<RefundResponse>, ApiError> {
    let refund = refund_service::process(&pool, RefundKind::Purchase, refund_id)
        .await
        .map_err(map_error)?;
    Ok(Json(refund))
}

/// Handler for POST /api/refunds/purchases/{refund_id}/void
pub async fn void_purchase_refund(
    State(pool): State<Arc<PgPool>>,
    Path(refund_id): Path<Uuid>,
) -> Result<Json<RefundResponse>, ApiError> {
    let refund = refund_service::void(&pool, RefundKind::Purchase, refund_id)
        .await
        .map_err(map_error)?;
    Ok(Json(refund))
}

/// Handler for DELETE /api/refunds/purchases/{refund_id}
pub async fn delete_purchase_refund(
    State(pool): State<Arc<PgPool>>,
    Path(refund_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    refund_service::delete(&pool, RefundKind::Purchase, refund_id)
        .await
        .map_err(map_error)?;
    Ok(StatusCode::NO_CONTENT)
}
