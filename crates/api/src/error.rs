use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use framecast_core::error::CoreError;
use framecast_pipeline::MergeError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and [`MergeError`] for exports, and
/// adds HTTP-specific variants. Implements [`IntoResponse`] to produce
/// consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `framecast_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failed merge/export.
    #[error(transparent)]
    Merge(#[from] MergeError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Internal(msg) => {
                    tracing::error!(error = %msg, "Internal core error");
                    internal()
                }
            },

            // --- Merge errors ---
            AppError::Merge(merge) => match merge {
                MergeError::NoCompletedJobs => (
                    StatusCode::BAD_REQUEST,
                    "NO_COMPLETED_JOBS",
                    merge.to_string(),
                ),
                MergeError::InvalidFrameRate(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", merge.to_string())
                }
                MergeError::Transcode(err) => {
                    tracing::error!(error = %err, "Merge transcode failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "MERGE_FAILED",
                        "Failed to merge videos".to_string(),
                    )
                }
                MergeError::Io(err) => {
                    tracing::error!(error = %err, "Merge preparation failed");
                    internal()
                }
            },

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
