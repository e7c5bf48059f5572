use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use flux_core::error::CoreError;
use flux_worker::manager::ArtifactError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`ArtifactError`] and adds HTTP-specific
/// variants. Implements [`IntoResponse`] to produce consistent JSON error
/// responses of the form `{"error": ..., "code": ...}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `flux_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An artifact lookup failure from the job manager.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

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
        let internal = || {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            )
        };

        let mut job_status = None;

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
                CoreError::DuplicateKey { .. }
                | CoreError::InvalidTransition { .. }
                | CoreError::Internal(_) => {
                    tracing::error!(error = %core, "Internal core error");
                    internal()
                }
            },

            // --- Artifact lookups ---
            AppError::Artifact(err) => match err {
                ArtifactError::UnknownJob => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", "Job not found".to_string())
                }
                ArtifactError::NotReady(status) => {
                    job_status = Some(*status);
                    (StatusCode::NOT_FOUND, "NOT_READY", err.to_string())
                }
                ArtifactError::Missing => (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string()),
                ArtifactError::Storage(e) => {
                    tracing::error!(error = %e, "Artifact storage error");
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

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(job_status) = job_status {
            body["status"] = json!(job_status);
        }

        (status, axum::Json(body)).into_response()
    }
}
