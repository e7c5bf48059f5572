//! Image generation backends.
//!
//! The job worker only ever sees the [`Generator`] trait. Two backends are
//! provided:
//!
//! - [`client::InferenceClient`] forwards requests to a remote diffusion
//!   server over HTTP.
//! - [`placeholder::PlaceholderGenerator`] renders a deterministic PNG
//!   locally, for development machines without an accelerator.
//!
//! The `flux-generate` binary drives either backend once from the command
//! line and writes the image to disk.

pub mod client;
pub mod model;
pub mod placeholder;

use async_trait::async_trait;
use flux_core::generation::GenerationParams;

pub use client::InferenceClient;
pub use model::FluxModel;
pub use placeholder::PlaceholderGenerator;

/// Errors raised while producing an artifact.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The HTTP request to the inference backend failed.
    #[error("Inference request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The inference backend answered with a non-2xx status.
    #[error("Inference backend error ({status}): {body}")]
    Backend { status: u16, body: String },

    /// The backend returned an empty body.
    #[error("Inference backend returned no image data")]
    EmptyOutput,

    /// Rendering or encoding the image failed.
    #[error("Image encoding failed: {0}")]
    Encode(String),
}

/// A loaded text-to-image model.
///
/// Implementations are assumed to be non-reentrant; callers serialize
/// access themselves.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce encoded PNG bytes for `params`.
    async fn generate(&self, params: &GenerationParams) -> Result<Vec<u8>, GenerationError>;

    /// Whether the model is ready to serve requests.
    fn model_loaded(&self) -> bool;

    /// Human-readable accelerator label, e.g. a GPU name or `"cpu"`.
    fn accelerator_name(&self) -> String;
}
