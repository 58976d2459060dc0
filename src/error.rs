//! Session error types with Axum response mapping.
//!
//! Local errors (key validation, cookie decoding, configuration) are
//! returned to the immediate caller unchanged. Remote-engine failures are
//! wrapped as [`SessionError::Backend`] and never retried here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::config::ConfigError;
use crate::kv::KvError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session key must be a non-empty string")]
    KeyFormat,

    #[error("session key not found")]
    KeyNotFound,

    #[error("malformed session cookie: {0}")]
    Decode(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Backend(#[from] KvError),

    #[error("session value encoding failed: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Whether a caller may reasonably retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SessionError::Backend(e) if e.is_retryable())
    }

    fn status(&self) -> StatusCode {
        match self {
            SessionError::KeyFormat | SessionError::Decode(_) | SessionError::Codec(_) => {
                StatusCode::BAD_REQUEST
            }
            SessionError::KeyNotFound => StatusCode::NOT_FOUND,
            SessionError::Backend(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            SessionError::Backend(_) => StatusCode::BAD_GATEWAY,
            SessionError::Config(_) | SessionError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "session request failed");
        }
        let body = match &self {
            // Backend details stay in the logs.
            SessionError::Backend(_) => json!({"error": "Session store unavailable"}),
            SessionError::Config(_) | SessionError::Internal(_) => {
                json!({"error": "Internal error"})
            }
            other => json!({"error": other.to_string()}),
        };

        (status, axum::Json(body)).into_response()
    }
}
