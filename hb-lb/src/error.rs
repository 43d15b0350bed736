//! Error types for hb-lb
//!
//! Pipeline errors abort a run and leave the published snapshot untouched.
//! Sink errors are logged and never affect the snapshot. API errors map to
//! JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of one reprocessing run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Source root, events directory or a required descriptor is missing
    #[error("Source unavailable: {0}")]
    SourceUnavailable(PathBuf),

    /// A descriptor exists but cannot be parsed
    #[error("Malformed record in {path}: {source}")]
    MalformedRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A descriptor exists but cannot be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blocking worker running the pipeline panicked or was cancelled
    #[error("Pipeline worker failed: {0}")]
    Worker(String),
}

/// Failure delivering exports to one sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Export I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Export request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Export endpoint rejected payload with status {0}")]
    Rejected(u16),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Access outside the allowed area (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// hb-common error
    #[error("Common error: {0}")]
    Common(#[from] hb_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
            ApiError::Common(hb_common::Error::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
