//! Error types for pixstash-ingest

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Per-item ingest failure
///
/// Scoped to the upload that produced it; siblings in the same batch are
/// unaffected.
#[derive(Debug, Error)]
pub enum IngestError {
    /// No decoder accepted the bytes (unsupported or corrupt source)
    #[error("decode failed: {0}")]
    Decode(String),

    /// Transcoding one of the variants failed
    #[error("encode failed: {0}")]
    Encode(String),

    /// Filesystem read/write failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog failure; variant files already written are left in place
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    /// Rejected before any work was done
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Blocking task panicked or was cancelled
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for IngestError {
    fn from(err: tokio::task::JoinError) -> Self {
        IngestError::Internal(err.to_string())
    }
}

pub type IngestResult<T> = Result<T, IngestError>;

/// Enrichment job control errors
#[derive(Debug, Error)]
pub enum JobError {
    /// A run already holds the single job slot
    #[error("enrichment job already running")]
    Conflict,

    /// Selecting the un-tagged assets failed
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. enrichment already running
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Upstream annotator service failed (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::Conflict => ApiError::Conflict(err.to_string()),
            JobError::Store(e) => ApiError::Database(e),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Database(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                err.to_string(),
            ),
            ApiError::Io(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "IO_ERROR",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, "{}", message);
        }

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
