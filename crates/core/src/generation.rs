//! Generation request defaults, bounds, and validation.
//!
//! A [`GenerateRequest`] is what a client sends; [`GenerateRequest::resolve`]
//! turns it into the fully-populated [`GenerationParams`] that travel with
//! the job record to the generator.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Default number of denoising steps (tuned for the 4-step schnell model).
pub const DEFAULT_STEPS: u32 = 4;
/// Default output width in pixels.
pub const DEFAULT_WIDTH: u32 = 1024;
/// Default output height in pixels.
pub const DEFAULT_HEIGHT: u32 = 1024;
/// Default classifier-free guidance scale. Schnell is guidance-distilled.
pub const DEFAULT_GUIDANCE: f32 = 0.0;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

pub const MIN_STEPS: u32 = 1;
pub const MAX_STEPS: u32 = 100;
pub const MIN_DIMENSION: u32 = 64;
pub const MAX_DIMENSION: u32 = 2048;

/// Validation message for an absent, empty, or whitespace-only prompt.
pub const MISSING_PROMPT: &str = "Missing 'prompt' in request body";

/// Values used for any optional field a client leaves out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationDefaults {
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    pub guidance: f32,
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            guidance: DEFAULT_GUIDANCE,
        }
    }
}

impl GenerationDefaults {
    /// Check that the configured defaults would themselves pass request
    /// validation.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_steps(self.steps)?;
        validate_dimension("width", self.width)?;
        validate_dimension("height", self.height)?;
        validate_guidance(self.guidance)
    }
}

// ---------------------------------------------------------------------------
// Request / params
// ---------------------------------------------------------------------------

/// Body of `POST /generate`. Every field is optional at the wire level so
/// that a missing prompt surfaces as a validation error instead of a
/// deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
    pub steps: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_seed")]
    pub seed: Option<u64>,
}

/// Seeds arrive as any JSON integer. Negative values keep their
/// two's-complement bit pattern, the way torch's `manual_seed` reads them.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireSeed {
    Unsigned(u64),
    Signed(i64),
}

fn deserialize_seed<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<WireSeed>::deserialize(deserializer)?.map(|seed| match seed {
        WireSeed::Unsigned(v) => v,
        WireSeed::Signed(v) => v as u64,
    }))
}

/// Fully-resolved generation parameters. Immutable once attached to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub prompt: String,
    pub steps: u32,
    pub guidance: f32,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
}

impl GenerateRequest {
    /// Validate the request and fill absent fields from `defaults`.
    pub fn resolve(self, defaults: &GenerationDefaults) -> Result<GenerationParams, CoreError> {
        let prompt = match self.prompt {
            Some(p) if !p.trim().is_empty() => p,
            _ => return Err(CoreError::Validation(MISSING_PROMPT.into())),
        };

        let steps = self.steps.unwrap_or(defaults.steps);
        let width = self.width.unwrap_or(defaults.width);
        let height = self.height.unwrap_or(defaults.height);

        validate_steps(steps)?;
        validate_dimension("width", width)?;
        validate_dimension("height", height)?;

        Ok(GenerationParams {
            prompt,
            steps,
            guidance: defaults.guidance,
            width,
            height,
            seed: self.seed,
        })
    }
}

fn validate_steps(steps: u32) -> Result<(), CoreError> {
    if (MIN_STEPS..=MAX_STEPS).contains(&steps) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "'steps' must be between {MIN_STEPS} and {MAX_STEPS}, got {steps}"
        )))
    }
}

/// Only the outer bounds are enforced. Sizes that do not divide into the
/// model's latent grid are passed through; the backend resizes them.
fn validate_dimension(field: &str, value: u32) -> Result<(), CoreError> {
    if (MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "'{field}' must be between {MIN_DIMENSION} and {MAX_DIMENSION}, got {value}"
        )))
    }
}

fn validate_guidance(guidance: f32) -> Result<(), CoreError> {
    if guidance.is_finite() && guidance >= 0.0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "guidance must be a finite non-negative number, got {guidance}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn request(prompt: &str) -> GenerateRequest {
        GenerateRequest {
            prompt: Some(prompt.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn absent_fields_take_defaults() {
        let params = request("a cat wearing sunglasses")
            .resolve(&GenerationDefaults::default())
            .unwrap();

        assert_eq!(params.steps, DEFAULT_STEPS);
        assert_eq!(params.width, DEFAULT_WIDTH);
        assert_eq!(params.height, DEFAULT_HEIGHT);
        assert_eq!(params.guidance, DEFAULT_GUIDANCE);
        assert_eq!(params.seed, None);
    }

    #[test]
    fn explicit_fields_win_over_defaults() {
        let req = GenerateRequest {
            prompt: Some("lighthouse".into()),
            steps: Some(8),
            width: Some(512),
            height: Some(768),
            seed: Some(42),
        };
        let params = req.resolve(&GenerationDefaults::default()).unwrap();

        assert_eq!(params.steps, 8);
        assert_eq!(params.width, 512);
        assert_eq!(params.height, 768);
        assert_eq!(params.seed, Some(42));
    }

    #[test]
    fn missing_prompt_is_rejected() {
        let result = GenerateRequest::default().resolve(&GenerationDefaults::default());
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn blank_prompt_is_rejected() {
        let result = request("   ").resolve(&GenerationDefaults::default());
        assert_matches!(result, Err(CoreError::Validation(_)));
    }

    #[test]
    fn zero_steps_rejected() {
        let mut req = request("x");
        req.steps = Some(0);
        assert_matches!(
            req.resolve(&GenerationDefaults::default()),
            Err(CoreError::Validation(msg)) if msg.contains("steps")
        );
    }

    #[test]
    fn unaligned_width_passes_through() {
        let mut req = request("x");
        req.width = Some(1001);
        req.height = Some(1004);
        let params = req.resolve(&GenerationDefaults::default()).unwrap();
        assert_eq!((params.width, params.height), (1001, 1004));
    }

    #[test]
    fn dimension_bounds_are_inclusive() {
        let mut req = request("x");
        req.width = Some(MAX_DIMENSION);
        req.height = Some(MIN_DIMENSION);
        assert!(req.resolve(&GenerationDefaults::default()).is_ok());
    }

    #[test]
    fn undersized_width_rejected() {
        let mut req = request("x");
        req.width = Some(MIN_DIMENSION - 1);
        assert_matches!(
            req.resolve(&GenerationDefaults::default()),
            Err(CoreError::Validation(msg)) if msg.contains("'width' must be between")
        );
    }

    #[test]
    fn oversized_height_rejected() {
        let mut req = request("x");
        req.height = Some(4096);
        assert!(req.resolve(&GenerationDefaults::default()).is_err());
    }

    #[test]
    fn defaults_validate() {
        assert!(GenerationDefaults::default().validate().is_ok());

        let bad = GenerationDefaults {
            guidance: f32::NAN,
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn missing_prompt_message_names_the_field() {
        assert_matches!(
            GenerateRequest::default().resolve(&GenerationDefaults::default()),
            Err(CoreError::Validation(msg)) if msg == MISSING_PROMPT
        );
    }

    #[test]
    fn negative_seed_is_accepted() {
        let req: GenerateRequest = serde_json::from_str(r#"{"prompt":"a","seed":-1}"#).unwrap();
        assert_eq!(req.seed, Some(u64::MAX));

        let req: GenerateRequest =
            serde_json::from_str(r#"{"prompt":"a","seed":18446744073709551615}"#).unwrap();
        assert_eq!(req.seed, Some(u64::MAX));
    }

    #[test]
    fn null_or_absent_seed_is_none() {
        let req: GenerateRequest = serde_json::from_str(r#"{"prompt":"a","seed":null}"#).unwrap();
        assert_eq!(req.seed, None);

        let req: GenerateRequest = serde_json::from_str(r#"{"prompt":"a"}"#).unwrap();
        assert_eq!(req.seed, None);
    }

    #[test]
    fn fractional_seed_is_rejected() {
        assert!(serde_json::from_str::<GenerateRequest>(r#"{"prompt":"a","seed":1.5}"#).is_err());
    }

    #[test]
    fn unknown_json_fields_are_ignored() {
        let req: GenerateRequest =
            serde_json::from_str(r#"{"prompt":"a","model":"dev","steps":2}"#).unwrap();
        assert_eq!(req.steps, Some(2));
    }
}
