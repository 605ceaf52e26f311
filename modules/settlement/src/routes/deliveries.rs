//! Cash delivery routes

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

use crate::contracts::deliveries::{
    CancelDeliveryRequest, ConfirmDeliveryRequest, CreateDeliveryRequest, DeliveryResponse,
    SettleableResponse,
};
use crate::routes::ApiError;
use crate::services::settlement_service::{self, SettlementError};

/// Map settlement errors to HTTP status codes
fn map_error(error: SettlementError) -> ApiError {
    let status = match &error {
        SettlementError::DeliveryNotFound(_)
        | SettlementError::LocationNotFound(_)
        | SettlementError::EmployeeNotFound(_)
        | SettlementError::OrderNotFound(_)
        | SettlementError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
        SettlementError::VoidedOrder(_)
        | SettlementError::CreditSaleOrder(_)
        | SettlementError::Validation(_) => StatusCode::BAD_REQUEST,
        SettlementError::AlreadySettled { .. }
        | SettlementError::DuplicateBatch
        | SettlementError::InvalidTransition { .. } => StatusCode::CONFLICT,
        SettlementError::UnknownStatus(_) => StatusCode::INTERNAL_SERVER_ERROR,
        SettlementError::Database(_) => {
            return ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    ApiError::new(status, error.to_string())
}

/// Query for GET /api/deliveries/settleable
#[derive(Debug, Deserialize)]
pub struct SettleableQuery {
    pub location_id: Uuid,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Query for GET /api/deliveries
#[derive(Debug, Deserialize)]
pub struct ListDeliveriesQuery {
    pub location_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Handler for GET /api/deliveries/settleable
pub async fn list_settleable(
    State(pool): State<Arc<PgPool>>,
    Query(query): Query<SettleableQuery>,
) -> Result<Json<SettleableResponse>, ApiError> {
    let settleable =
        settlement_service::list_settleable(&pool, query.location_id, query.from, query.to)
            .await
            .map_err(map_error)?;
    Ok(Json(settleable))
}

/// Handler for GET /api/deliveries
pub async fn list_deliveries(
    State(pool): State<Arc<PgPool>>,
    Query(query): Query<ListDeliveriesQuery>,
) -> Result<Json<Vec<DeliveryResponse>>, ApiError> {
    let deliveries = settlement_service::list(
        &pool,
        query.location_id,
        query.employee_id,
        query.from,
        query.to,
    )
    .await
    .map_err(map_error)?;
    Ok(Json(deliveries))
}

/// Handler for GET /api/deliveries/{delivery_id}
pub async fn get_delivery(
    State(pool): State<Arc<PgPool>>,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    let delivery = settlement_service::get(&pool, delivery_id)
        .await
        .map_err(map_error)?;
    Ok(Json(delivery))
}

/// Handler for POST /api/deliveries
pub async fn create_delivery(
    State(pool): State<Arc<PgPool>>,
    Json(request): Json<CreateDeliveryRequest>,
) -> Result<(StatusCode, Json<DeliveryResponse>), ApiError> {
    let delivery = settlement_service::create(&pool, request)
        .await
        .map_err(map_error)?;
    Ok((StatusCode::CREATED, Json(delivery)))
}

/// Handler for POST /api/deliveries/{delivery_id}/confirm
pub async fn confirm_delivery(
    State(pool): State<Arc<PgPool>>,
    Path(delivery_id): Path<Uuid>,
    Json(request): Json<ConfirmDeliveryRequest>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    let delivery = settlement_service::confirm(&pool, delivery_id, request.declared_amount)
        .await
        .map_err(map_error)?;
    Ok(Json(delivery))
}

/// Handler for POST /api/deliveries/{delivery_id}/cancel
pub async fn cancel_delivery(
    State(pool): State<Arc<PgPool>>,
    Path(delivery_id): Path<Uuid>,
    Json(request): Json<CancelDeliveryRequest>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    let delivery = settlement_service::cancel(&pool, delivery_id, &request.reason)
        .await
        .map_err(map_error)?;
    Ok(Json(delivery))
}

/// Handler for POST /api/deliveries/{delivery_id}/verify
pub async fn verify_delivery(
    State(pool): State<Arc<PgPool>>,
    Path(delivery_id): Path<Uuid>,
) -> Result<Json<DeliveryResponse>, ApiError> {
    let delivery = settlement_service::verify(&pool, delivery_id)
        .await
        .map_err(map_error)?;
    Ok(Json(delivery))
}

/// Handler for DELETE /api/deliveries/{delivery_id}
pub async fn delete_delivery(
    State(pool): State<Arc<PgPool>>,
    Path(delivery_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    settlement_service::delete(&pool, delivery_id)
        .await
        .map_err(map_error)?;
    Ok(StatusCode::NO_CONTENT)
}
