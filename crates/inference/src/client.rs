//! HTTP client for a remote diffusion inference server.
//!
//! The server is expected to expose `POST /generate`, answering with the
//! encoded PNG body, and `GET /health`.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use flux_core::generation::GenerationParams;
use serde::Serialize;

use crate::model::FluxModel;
use crate::{GenerationError, Generator};

/// Wire body sent to the inference server.
#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    prompt: &'a str,
    num_inference_steps: u32,
    guidance_scale: f32,
    width: u32,
    height: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    /// Repository id of the checkpoint; the server's own default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'static str>,
}

impl<'a> InferenceRequest<'a> {
    fn new(p: &'a GenerationParams, model: Option<FluxModel>) -> Self {
        Self {
            prompt: &p.prompt,
            num_inference_steps: p.steps,
            guidance_scale: p.guidance,
            width: p.width,
            height: p.height,
            seed: p.seed,
            model: model.map(FluxModel::repo_id),
        }
    }
}

/// Generator backed by a remote inference server.
pub struct InferenceClient {
    client: reqwest::Client,
    api_url: String,
    device: String,
    model: Option<FluxModel>,
    loaded: AtomicBool,
}

impl InferenceClient {
    /// * `api_url` - Base HTTP URL, e.g. `http://gpu-box:7860`.
    /// * `device` - Accelerator label reported by `/health`.
    pub fn new(api_url: String, device: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            device,
            model: None,
            loaded: AtomicBool::new(false),
        }
    }

    /// Ask the backend for a specific checkpoint on every request.
    pub fn with_model(mut self, model: FluxModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Check that the backend answers its health endpoint, and remember
    /// the outcome for [`Generator::model_loaded`].
    pub async fn probe(&self) -> bool {
        let healthy = match self
            .client
            .get(format!("{}/health", self.api_url))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!(api_url = %self.api_url, error = %e, "Inference backend unreachable");
                false
            }
        };
        self.loaded.store(healthy, Ordering::Relaxed);
        healthy
    }
}

#[async_trait]
impl Generator for InferenceClient {
    async fn generate(&self, params: &GenerationParams) -> Result<Vec<u8>, GenerationError> {
        let response = self
            .client
            .post(format!("{}/generate", self.api_url))
            .json(&InferenceRequest::new(params, self.model))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(GenerationError::EmptyOutput);
        }
        self.loaded.store(true, Ordering::Relaxed);
        Ok(bytes.to_vec())
    }

    fn model_loaded(&self) -> bool {
        self.loaded.load(Ordering::Relaxed)
    }

    fn accelerator_name(&self) -> String {
        self.device.clone()
    }
}
