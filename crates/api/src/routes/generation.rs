//! Route definitions for image generation jobs.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::generation;
use crate::state::AppState;

/// ```text
/// POST   /generate            -> submit
/// GET    /status/{job_id}     -> job_status
/// GET    /image/{job_id}      -> job_image
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generation::submit))
        .route("/status/{job_id}", get(generation::job_status))
        .route("/image/{job_id}", get(generation::job_image))
}
