use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::gemini::GeminiError;

/// Failure of a single AI flow invocation.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model output violates schema: {0}")]
    SchemaViolation(String),

    #[error("generation failed: {0}")]
    Generation(#[source] GeminiError),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no record with id {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to persist {path}: {reason}")]
    Persistence { path: String, reason: String },
}

fn error_body(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for FlowError {
    fn into_response(self) -> Response {
        match self {
            FlowError::InvalidInput(msg) => error_body(StatusCode::BAD_REQUEST, msg),
            FlowError::SchemaViolation(msg) => {
                warn!("⚠️ Model output rejected: {}", msg);
                error_body(
                    StatusCode::BAD_GATEWAY,
                    "The AI service returned an unexpected response. Please try again.".into(),
                )
            }
            FlowError::Generation(cause) => {
                error!("❌ Generation failed: {}", cause);
                let status = if matches!(cause, GeminiError::Timeout(_)) {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                };
                error_body(status, "The AI service could not complete the request. Please try again.".into())
            }
        }
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            StoreError::Persistence { .. } => {
                error!("❌ {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        error_body(status, self.to_string())
    }
}
