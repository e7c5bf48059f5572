use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /
///
/// Static description of the API, including the configured defaults for
/// optional request fields.
pub async fn index(State(state): State<AppState>) -> Json<Value> {
    let defaults = &state.config.generation;
    let example_id = "550e8400-e29b-41d4-a716-446655440000";

    Json(json!({
        "name": "Flux Image Generation API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /health": "Health check",
            "POST /generate": "Generate image from prompt (returns job_id)",
            "GET /status/{job_id}": "Check generation status",
            "GET /image/{job_id}": "Download generated image",
        },
        "defaults": {
            "steps": defaults.steps,
            "width": defaults.width,
            "height": defaults.height,
        },
        "example": {
            "request": {
                "method": "POST",
                "url": "/generate",
                "body": {
                    "prompt": "a cat wearing sunglasses",
                    "steps": 4,
                    "width": 1024,
                    "height": 1024,
                    "seed": 42,
                },
            },
            "response": {
                "job_id": example_id,
                "status_url": format!("/status/{example_id}"),
                "image_url": format!("/image/{example_id}"),
            },
        },
    }))
}
