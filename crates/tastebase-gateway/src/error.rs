//! Gateway error types and their client-facing mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors produced while forwarding a request to the backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The backend was unreachable, reset the connection, or timed out.
    #[error("{0}")]
    Proxy(String),

    /// The request or response could not be rebuilt inside the gateway.
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            GatewayError::Proxy(_) => (StatusCode::BAD_GATEWAY, "bad_gateway"),
            GatewayError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = json!({
            "error": code,
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}
