//! Domain error to HTTP response mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use groupbuy_core::group::GroupError;
use groupbuy_core::payment::PaymentError;

fn error_response(status: u16, code: &str, message: String) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
        tracing::error!(error = %message, code, "Request failed");
        return (
            status,
            Json(json!({
                "error": code,
                "message": "Internal server error"
            })),
        )
            .into_response();
    }
    (status, Json(json!({ "error": code, "message": message }))).into_response()
}

/// Maps a group, membership or negotiation error to a response.
pub(crate) fn map_group_error(e: &GroupError) -> Response {
    error_response(e.status_code(), e.error_code(), e.to_string())
}

/// Maps a payment error to a response.
pub(crate) fn map_payment_error(e: &PaymentError) -> Response {
    if matches!(e, PaymentError::Gateway(_) | PaymentError::GatewayTimeout) {
        tracing::warn!(error = %e, "Payment gateway call failed");
    }
    error_response(e.status_code(), e.error_code(), e.to_string())
}

/// 400 response for a malformed request parameter.
pub(crate) fn bad_request(message: impl Into<String>) -> Response {
    error_response(400, "VALIDATION_ERROR", message.into())
}
