#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use flux_core::generation::{GenerationDefaults, GenerationParams};
use flux_inference::{GenerationError, Generator, PlaceholderGenerator};
use flux_worker::artifacts::LocalArtifactStore;
use flux_worker::status_table::InMemoryStatusTable;
use flux_worker::JobManager;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use flux_api::config::ServerConfig;
use flux_api::router::build_app_router;
use flux_api::state::AppState;

/// Build a test `ServerConfig` with small default images so generation in
/// tests stays fast.
pub fn test_config(output_dir: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        output_dir: output_dir.to_path_buf(),
        generation: GenerationDefaults {
            width: 64,
            height: 64,
            ..GenerationDefaults::default()
        },
        inference_url: None,
        inference_device: "cuda".to_string(),
        inference_model: None,
        job_retention_hours: None,
    }
}

pub struct TestApp {
    pub router: Router,
    pub jobs: Arc<JobManager>,
    _dir: TempDir,
}

/// Build the full application router around `generator`, mirroring
/// `main.rs`.
pub async fn build_test_app(generator: Arc<dyn Generator>) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let store = LocalArtifactStore::open(&config.output_dir).await.unwrap();

    let (jobs, _worker) = JobManager::start(
        Arc::new(InMemoryStatusTable::new()),
        Arc::new(store),
        generator,
        config.generation,
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        jobs: Arc::clone(&jobs),
    };

    TestApp {
        router: build_app_router(state, &config),
        jobs,
        _dir: dir,
    }
}

pub async fn placeholder_app() -> TestApp {
    build_test_app(Arc::new(PlaceholderGenerator::new())).await
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submit `body` and return the `job_id` from the 202 response.
pub async fn submit(app: &Router, body: serde_json::Value) -> String {
    let response = post_json(app, "/generate", body).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Poll `/status/{id}` until it reports a terminal state. Returns every
/// distinct status seen, in order, and the final body.
pub async fn poll_until_done(app: &Router, id: &str) -> (Vec<String>, serde_json::Value) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    let mut seen: Vec<String> = Vec::new();
    loop {
        let response = get(app, &format!("/status/{id}")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let status = json["status"].as_str().unwrap().to_string();
        if seen.last() != Some(&status) {
            seen.push(status.clone());
        }
        if status == "complete" || status == "error" {
            return (seen, json);
        }
        assert!(tokio::time::Instant::now() < deadline, "job {id} stuck in {status}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

/// Blocks every call until a permit is released, then returns a PNG
/// header (or fails, if built with `failing`).
pub struct GatedGenerator {
    gate: Semaphore,
    fail: bool,
}

impl GatedGenerator {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            gate: Semaphore::new(0),
            fail: true,
        }
    }

    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

#[async_trait]
impl Generator for GatedGenerator {
    async fn generate(&self, _params: &GenerationParams) -> Result<Vec<u8>, GenerationError> {
        self.gate.acquire().await.unwrap().forget();
        if self.fail {
            return Err(GenerationError::Backend {
                status: 500,
                body: "CUDA out of memory".into(),
            });
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    fn model_loaded(&self) -> bool {
        false
    }

    fn accelerator_name(&self) -> String {
        "gated".into()
    }
}
