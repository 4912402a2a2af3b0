// Error taxonomy: sampling, delivery and API boundary errors

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// A metric source could not be read. Per-item failures are skipped by the sampler;
/// a whole-family failure degrades the matching snapshot fields to unknown.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SampleError {
    #[error("{source_name} unavailable: {reason}")]
    SourceUnavailable {
        source_name: &'static str,
        reason: String,
    },
    #[error("{source_name} timed out after {timeout_ms}ms")]
    TimedOut {
        source_name: &'static str,
        timeout_ms: u64,
    },
}

impl SampleError {
    pub fn unavailable(source_name: &'static str, reason: impl ToString) -> Self {
        SampleError::SourceUnavailable {
            source_name,
            reason: reason.to_string(),
        }
    }
}

/// Why a snapshot did not reach its destination. Never retried inside the same cycle
/// unless a retry policy wraps the transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),
    #[error("backend rejected credentials ({0})")]
    AuthRejected(StatusCode),
    #[error("backend returned {0}")]
    Status(StatusCode),
    #[error("could not encode snapshot: {0}")]
    Encode(String),
}

impl DeliveryError {
    /// Transient failures worth another attempt under a retry policy.
    pub fn is_transient(&self) -> bool {
        match self {
            DeliveryError::Unreachable(_) => true,
            DeliveryError::Status(code) => code.is_server_error(),
            DeliveryError::AuthRejected(_) | DeliveryError::Encode(_) => false,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

/// Errors surfaced to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    AuthRejected { code: &'static str, message: String },
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unavailable(String),
    #[error("{0}")]
    Timeout(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::AuthRejected {
            code: "UNAUTHORIZED",
            message: message.into(),
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::AuthRejected { code, .. } => (StatusCode::UNAUTHORIZED, code),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unprocessable(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_SNAPSHOT"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "UNAVAILABLE"),
            ApiError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl From<SampleError> for ApiError {
    fn from(e: SampleError) -> Self {
        match e {
            SampleError::TimedOut { .. } => ApiError::Timeout(e.to_string()),
            SampleError::SourceUnavailable { .. } => ApiError::Unavailable(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error = match &self {
            ApiError::Internal(e) => {
                tracing::error!(error = %e, "request failed");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(ErrorBody {
                error,
                code: code.to_string(),
            }),
        )
            .into_response()
    }
}
