//! One-shot image generation from the command line.
//!
//! Sends a single request to an inference server (`--inference-url` or
//! `INFERENCE_URL`) and writes the PNG to `--output`. Without a server it
//! renders the local placeholder image instead.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use flux_core::generation::{
    GenerateRequest, GenerationDefaults, GenerationParams, DEFAULT_GUIDANCE, DEFAULT_HEIGHT,
    DEFAULT_STEPS, DEFAULT_WIDTH,
};
use flux_inference::{FluxModel, Generator, InferenceClient, PlaceholderGenerator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ModelArg {
    Schnell,
    Dev,
}

impl From<ModelArg> for FluxModel {
    fn from(arg: ModelArg) -> Self {
        match arg {
            ModelArg::Schnell => FluxModel::Schnell,
            ModelArg::Dev => FluxModel::Dev,
        }
    }
}

/// Generate images with Flux.1
#[derive(Parser, Debug)]
#[command(name = "flux-generate", version)]
struct Cli {
    /// Text prompt for image generation
    #[arg(long)]
    prompt: String,

    /// Model to use (schnell is faster, dev is higher quality)
    #[arg(long, value_enum, default_value_t = ModelArg::Schnell)]
    model: ModelArg,

    /// Number of inference steps (schnell: 1-4, dev: 20-50)
    #[arg(long, default_value_t = DEFAULT_STEPS)]
    steps: u32,

    /// Guidance scale (schnell uses 0.0)
    #[arg(long, allow_negative_numbers = true, default_value_t = DEFAULT_GUIDANCE)]
    guidance: f32,

    /// Image width
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Image height
    #[arg(long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// Output filename
    #[arg(long, default_value = "output.png")]
    output: PathBuf,

    /// Random seed for reproducibility
    #[arg(long, allow_negative_numbers = true)]
    seed: Option<i64>,

    /// Inference server base URL. Unset renders a local placeholder.
    #[arg(long, env = "INFERENCE_URL")]
    inference_url: Option<String>,

    /// Accelerator label for the inference server
    #[arg(long, env = "INFERENCE_DEVICE", default_value = "cuda")]
    device: String,
}

impl Cli {
    /// Validate the flags the same way the HTTP service validates a body.
    fn params(&self) -> Result<GenerationParams, flux_core::error::CoreError> {
        let defaults = GenerationDefaults {
            guidance: self.guidance,
            ..GenerationDefaults::default()
        };
        defaults.validate()?;

        GenerateRequest {
            prompt: Some(self.prompt.clone()),
            steps: Some(self.steps),
            width: Some(self.width),
            height: Some(self.height),
            seed: self.seed.map(|s| s as u64),
        }
        .resolve(&defaults)
    }

    fn generator(&self) -> Box<dyn Generator> {
        match &self.inference_url {
            Some(url) => Box::new(
                InferenceClient::new(url.clone(), self.device.clone())
                    .with_model(self.model.into()),
            ),
            None => {
                tracing::warn!("No inference server configured, rendering a placeholder image");
                Box::new(PlaceholderGenerator::new())
            }
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<PathBuf> {
    let params = cli.params().context("Invalid generation parameters")?;

    let model = FluxModel::from(cli.model);
    if !model.recommended_steps().contains(&params.steps) {
        tracing::warn!(
            model = %model,
            steps = params.steps,
            recommended = ?model.recommended_steps(),
            "Step count outside the model's usual range"
        );
    }

    let generator = cli.generator();
    tracing::info!(
        model = %model,
        accelerator = %generator.accelerator_name(),
        prompt = %params.prompt,
        steps = params.steps,
        guidance = params.guidance,
        width = params.width,
        height = params.height,
        seed = ?params.seed,
        "Generating image"
    );

    let png = generator
        .generate(&params)
        .await
        .context("Image generation failed")?;

    tokio::fs::write(&cli.output, &png)
        .await
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    Ok(tokio::fs::canonicalize(&cli.output)
        .await
        .unwrap_or(cli.output))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flux_generate=info,flux_inference=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(path) => {
            println!("Image saved to: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("flux-generate failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
