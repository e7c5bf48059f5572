//! Handlers for submitting generation jobs and reading them back.
//!
//! Submission never waits for the image: it returns `202 Accepted` with
//! the job id and the URLs to poll. Generation errors are only visible
//! through `GET /status/{job_id}`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use flux_core::error::CoreError;
use flux_core::generation::{GenerateRequest, MISSING_PROMPT};
use flux_core::job::{Job, JobStatus};
use flux_core::types::JobId;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Body of a `202 Accepted` from `POST /generate`.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status_url: String,
    pub image_url: String,
}

/// Body of `GET /status/{job_id}`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    pub prompt: String,
    /// Present only once the job is `complete`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Present only once the job is `error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Job> for StatusResponse {
    fn from(job: Job) -> Self {
        let image_url = (job.status == JobStatus::Complete).then(|| image_url(job.id));
        let error = (job.status == JobStatus::Error).then(|| {
            job.error_detail
                .unwrap_or_else(|| "Unknown error".to_string())
        });

        Self {
            job_id: job.id,
            status: job.status,
            prompt: job.params.prompt,
            image_url,
            error,
        }
    }
}

pub fn status_url(id: JobId) -> String {
    format!("/status/{id}")
}

pub fn image_url(id: JobId) -> String {
    format!("/image/{id}")
}

/// Parse a path segment as a job id. Malformed ids are reported as
/// not found, same as well-formed unknown ones.
fn parse_job_id(raw: &str) -> AppResult<JobId> {
    raw.parse().map_err(|_| {
        AppError::Core(CoreError::NotFound {
            entity: "Job",
            id: raw.to_string(),
        })
    })
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

/// Decode a submission body. An absent or blank body is a missing prompt;
/// anything else that fails to decode is reported as it is.
fn parse_submission(body: &[u8]) -> AppResult<GenerateRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(AppError::Core(CoreError::Validation(MISSING_PROMPT.into())));
    }
    let Json(request) = Json::<GenerateRequest>::from_bytes(body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    Ok(request)
}

/// POST /generate
///
/// Validate the request, queue a job, and return `202` with its id.
pub async fn submit(State(state): State<AppState>, body: Bytes) -> AppResult<impl IntoResponse> {
    let request = parse_submission(&body)?;
    let job = state.jobs.submit(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id: job.id,
            status_url: status_url(job.id),
            image_url: image_url(job.id),
        }),
    ))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /status/{job_id}
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    let id = parse_job_id(&job_id)?;
    let job = state.jobs.status(id).await?;
    Ok(Json(job.into()))
}

// ---------------------------------------------------------------------------
// Image
// ---------------------------------------------------------------------------

/// GET /image/{job_id}
///
/// Returns the PNG once the job is complete, `404` before that.
pub async fn job_image(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let id = parse_job_id(&job_id)?;
    let bytes = state.jobs.artifact(id).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes))
}
