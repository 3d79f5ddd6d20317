//! HTTP-layer error wrapper (§7.1): maps a `PaymentError` kind to a status
//! code and writes a plain-text-plus-newline body, not a JSON envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use nanorelay_core::PaymentError;

pub struct ApiError(pub PaymentError);

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            PaymentError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            PaymentError::NotFound => (StatusCode::BAD_REQUEST, "Invalid payment id".to_string()),
            PaymentError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            PaymentError::Upstream(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            PaymentError::Timeout => {
                (StatusCode::INTERNAL_SERVER_ERROR, "timed out waiting for settlement".to_string())
            }
            PaymentError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };
        tracing::debug!(status = %status, %message, "request failed");
        (status, format!("{message}\n")).into_response()
    }
}
