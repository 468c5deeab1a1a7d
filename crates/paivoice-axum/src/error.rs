//! Axum-specific error type and HTTP mappings.
//!
//! The wire shape is fixed: `{"status": "error", "message": "…"}` with
//! 400 for validation failures, 429 for rate limiting and 500 for
//! anything else that escapes a handler.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use paivoice_core::VoiceError;

/// Errors a handler can return to the HTTP caller.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Invalid request body or field.
    #[error("{0}")]
    BadRequest(String),

    /// Too many requests inside the window.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Unexpected failure on the synchronous request path.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded".to_string(),
            ),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        let body = ErrorBody {
            status: "error",
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<VoiceError> for HttpError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::InvalidInput { reason, .. } => Self::BadRequest(reason),
            VoiceError::RateLimited => Self::RateLimited,
            other => Self::Internal(other.to_string()),
        }
    }
}
