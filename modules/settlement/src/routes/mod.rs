//! HTTP route handlers and the service-error → status mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

pub mod credits;
pub mod deliveries;
pub mod expenses;
pub mod payments;
pub mod refunds;

/// Error response wrapper
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Service error mapped to an HTTP response
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
