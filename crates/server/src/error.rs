//! Server error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use fsm::FsmError;
use service_store::StoreError;
use thiserror::Error;

/// Errors that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Can't connect to NATS at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Can't subscribe to '{subject}': {reason}")]
    Subscribe { subject: String, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Can't read workflow file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid workflow: {0}")]
    Workflow(#[from] DomainError),
}

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

impl From<FsmError> for ApiError {
    fn from(err: FsmError) -> Self {
        match err {
            FsmError::ServiceNotFound(id) => ApiError::NotFound(format!("Service {id} not found")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}
