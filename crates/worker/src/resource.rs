//! Mutex-guarded handle to the single, non-reentrant generator.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use flux_core::generation::GenerationParams;
use flux_inference::{GenerationError, Generator};
use futures::FutureExt;
use tokio::sync::Mutex;

/// Why a generation call produced no artifact.
#[derive(Debug, thiserror::Error)]
pub enum GenerationFailure {
    #[error(transparent)]
    Generator(#[from] GenerationError),

    #[error("Generator panicked: {0}")]
    Panicked(String),
}

/// Owns the loaded generator and serializes every call into it.
///
/// The guard is held for exactly one `generate` call, so at most one
/// invocation is in flight no matter how many workers share the handle.
pub struct GenerationResource {
    generator: Arc<dyn Generator>,
    guard: Mutex<()>,
}

impl GenerationResource {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            guard: Mutex::new(()),
        }
    }

    /// Run one generation under the guard. A panic inside the generator is
    /// caught and reported as [`GenerationFailure::Panicked`].
    pub async fn generate(&self, params: &GenerationParams) -> Result<Vec<u8>, GenerationFailure> {
        let _permit = self.guard.lock().await;

        match AssertUnwindSafe(self.generator.generate(params))
            .catch_unwind()
            .await
        {
            Ok(result) => Ok(result?),
            Err(panic) => Err(GenerationFailure::Panicked(panic_message(panic.as_ref()))),
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.generator.model_loaded()
    }

    pub fn accelerator_name(&self) -> String {
        self.generator.accelerator_name()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
