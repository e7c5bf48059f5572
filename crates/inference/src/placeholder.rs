//! Local stand-in generator that renders a seeded gradient with noise.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use flux_core::generation::GenerationParams;
use image::{ImageFormat, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{GenerationError, Generator};

/// Renders `width x height` PNGs without any model.
///
/// Output is a pure function of `(prompt, seed, width, height)` when a seed
/// is given, stable across builds for a fixed `rand` release. An optional
/// per-step delay simulates inference latency.
#[derive(Debug, Clone, Default)]
pub struct PlaceholderGenerator {
    step_delay: Duration,
}

impl PlaceholderGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep `delay` per denoising step before returning.
    pub fn with_step_delay(delay: Duration) -> Self {
        Self { step_delay: delay }
    }
}

#[async_trait]
impl Generator for PlaceholderGenerator {
    async fn generate(&self, params: &GenerationParams) -> Result<Vec<u8>, GenerationError> {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay * params.steps).await;
        }

        let seed = params.seed.unwrap_or_else(|| rand::rng().random());
        let rng_seed = fnv1a(params.prompt.as_bytes()) ^ seed;
        let (width, height) = (params.width, params.height);

        tokio::task::spawn_blocking(move || render_png(rng_seed, width, height))
            .await
            .map_err(|e| GenerationError::Encode(format!("render task failed: {e}")))?
    }

    fn model_loaded(&self) -> bool {
        true
    }

    fn accelerator_name(&self) -> String {
        "cpu (placeholder)".to_string()
    }
}

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET_BASIS, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(PRIME)
    })
}

fn render_png(seed: u64, width: u32, height: u32) -> Result<Vec<u8>, GenerationError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let from: [u8; 3] = rng.random();
    let to: [u8; 3] = rng.random();
    let span = (width + height).max(1) as f32;

    let img = RgbImage::from_fn(width, height, |x, y| {
        let t = (x + y) as f32 / span;
        let jitter: i16 = rng.random_range(-8..=8);
        let channel = |i: usize| {
            let base = from[i] as f32 + (to[i] as f32 - from[i] as f32) * t;
            (base as i16 + jitter).clamp(0, 255) as u8
        };
        Rgb([channel(0), channel(1), channel(2)])
    });

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| GenerationError::Encode(e.to_string()))?;
    Ok(buf.into_inner())
}
