//! Gateway error types

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use switchyard_kernel::{AdapterError, RegistryError};
use thiserror::Error;

/// Errors surfaced to callers before (or instead of) a response stream.
///
/// Once a chat stream has started, adapter failures travel inside it as
/// content; only embeddings return [`GatewayError::Adapter`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error("adapter '{0}' not found")]
    AdapterNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

impl GatewayError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            GatewayError::AdapterNotFound(_) => (StatusCode::NOT_FOUND, "ADAPTER_NOT_FOUND"),
            GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            GatewayError::Registry(_) => (StatusCode::INTERNAL_SERVER_ERROR, "REGISTRY_ERROR"),
            GatewayError::Adapter(_) => (StatusCode::BAD_GATEWAY, "ADAPTER_ERROR"),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
