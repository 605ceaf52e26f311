//! Payment (abono) routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::contracts::payments::{
    CreatePaymentRequest, PaymentResponse, UpdatePaymentRequest,
};
use crate::routes::ApiError;
use crate::services::payment_service::{self, PaymentError};

/// Map payment errors to HTTP status codes
fn map_error(error: PaymentError) -> ApiError {
    let status = match &error {
        PaymentError::CreditNotFound(_)
        | PaymentError::PaymentNotFound(_)
        | PaymentError::PaymentNotOnCredit { .. }
        | PaymentError::OrderNotFound(_)
        | PaymentError::LocationNotFound(_)
        | PaymentError::EmployeeNotFound(_) => StatusCode::NOT_FOUND,
        PaymentError::CrossCustomerOrder { .. }
        | PaymentError::ExceedsBalance { .. }
        | PaymentError::Validation(_) => StatusCode::BAD_REQUEST,
        PaymentError::SettledPayment(_) => StatusCode::CONFLICT,
        PaymentError::Database(_) => {
            return ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };
    ApiError::new(status, error.to_string())
}

/// Handler for GET /api/credits/{credit_id}/payments
pub async fn list_payments(
    State(pool): State<Arc<PgPool>>,
    Path(credit_id): Path<Uuid>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = payment_service::list(&pool, credit_id)
        .await
        .map_err(map_error)?;
    Ok(Json(payments))
}

/// Handler for POST /api/credits/{credit_id}/payments
pub async fn create_payment(
    State(pool): State<Arc<PgPool>>,
    Path(credit_id): Path<Uuid>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let payment = payment_service::create(&pool, credit_id, request)
        .await
        .map_err(map_error)?;
    Ok((StatusCode::CREATED, Json(payment)))
}

/// Handler for PUT /api/credits/{credit_id}/payments/{payment_id}
pub async fn update_payment(
    State(pool): State<Arc<PgPool>>,
    Path((credit_id, payment_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = payment_service::update(&pool, credit_id, payment_id, request)
        .await
        .map_err(map_error)?;
    Ok(Json(payment))
}

/// Handler for DELETE /api/credits/{credit_id}/payments/{payment_id}
pub async fn delete_payment(
    State(pool): State<Arc<PgPool>>,
    Path((credit_id, payment_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    payment_service::delete(&pool, credit_id, payment_id)
        .await
        .map_err(map_error)?;
    Ok(StatusCode::NO_CONTENT)
}
