pub mod generation;
pub mod health;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the public route tree.
///
/// ```text
/// /                      API documentation (GET)
/// /generate              submit a generation job (POST)
/// /status/{job_id}       job status (GET)
/// /image/{job_id}        generated image (GET)
/// ```
///
/// `/health` is mounted separately by [`health::router`].
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::docs::index))
        .merge(generation::router())
}
