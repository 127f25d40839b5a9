//! # API Error Types
//!
//! Two response shapes:
//!
//! - [`AnchorFailure`] is the envelope of the anchoring endpoints,
//!   `{"status":"ERROR","message":...,"code":...}`, always with HTTP 500.
//!   Upstream pipelines match on `status`, so the shape is fixed.
//! - [`AppError`] serves the operator read side and the rate limiter with a
//!   structured `{"error":{"code","message"}}` body and conventional codes.
//!
//! Store failures never expose database detail to clients; it is logged.

use anchor_core::AnchorError;
use anchor_store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Errors of the operator read side.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Query or path parameter failed validation (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => {
                tracing::error!(error = %self, "internal server error");
                "An internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<anchor_core::ValidationError> for AppError {
    fn from(err: anchor_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(format!("audit record {id}")),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Error envelope of `/validate` (and `validator_error` in relay responses).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBody {
    /// Always `"ERROR"`.
    pub status: String,
    /// Human-readable detail.
    pub message: String,
    /// [`AnchorError::kind`].
    pub code: String,
}

/// A failed anchoring request, rendered as `500 {status:"ERROR", ...}`.
#[derive(Debug)]
pub struct AnchorFailure(pub AnchorError);

impl AnchorFailure {
    /// The response body for this failure.
    pub fn body(&self) -> FailureBody {
        let message = match &self.0 {
            AnchorError::Store(_) => "audit store unavailable".to_string(),
            other => other.to_string(),
        };
        FailureBody {
            status: "ERROR".to_string(),
            message,
            code: self.0.kind().to_string(),
        }
    }
}

impl From<AnchorError> for AnchorFailure {
    fn from(err: AnchorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AnchorFailure {
    fn into_response(self) -> Response {
        if let AnchorError::Store(detail) = &self.0 {
            tracing::error!(error = %detail, "audit store failure during anchoring");
        }
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self.body())).into_response()
    }
}
