use std::path::PathBuf;

use flux_core::generation::{
    GenerationDefaults, DEFAULT_GUIDANCE, DEFAULT_HEIGHT, DEFAULT_STEPS, DEFAULT_WIDTH,
};
use flux_inference::FluxModel;

/// Upper bound for `JOB_RETENTION_HOURS` (ten years).
pub const MAX_RETENTION_HOURS: i64 = 24 * 365 * 10;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for a single-GPU box. Override via
/// environment variables (or a `.env` file).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `6006`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`). Generation itself
    /// runs on the worker and is not bounded by this.
    pub request_timeout_secs: u64,
    /// How long to wait for the worker to finish its current job on
    /// shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Directory generated images are written to.
    pub output_dir: PathBuf,
    /// Values for request fields the client leaves out.
    pub generation: GenerationDefaults,
    /// Base URL of a remote inference server. `None` selects the local
    /// placeholder generator.
    pub inference_url: Option<String>,
    /// Accelerator label reported for the remote inference server.
    pub inference_device: String,
    /// Checkpoint requested from the remote inference server. `None` leaves
    /// the choice to the server.
    pub inference_model: Option<FluxModel>,
    /// Evict finished jobs older than this many hours. `None` keeps every
    /// job for the life of the process.
    pub job_retention_hours: Option<i64>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `6006`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    /// | `OUTPUT_DIR`            | `/workspace/outputs`    |
    /// | `DEFAULT_STEPS`         | `4`                     |
    /// | `DEFAULT_WIDTH`         | `1024`                  |
    /// | `DEFAULT_HEIGHT`        | `1024`                  |
    /// | `DEFAULT_GUIDANCE`      | `0.0`                   |
    /// | `INFERENCE_URL`         | unset                   |
    /// | `INFERENCE_DEVICE`      | `cuda`                  |
    /// | `INFERENCE_MODEL`       | unset                   |
    /// | `JOB_RETENTION_HOURS`   | unset                   |
    ///
    /// Panics on unparseable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = parse_var("PORT", 6006);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = parse_var("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs: u64 = parse_var("SHUTDOWN_TIMEOUT_SECS", 30);

        let output_dir = std::env::var("OUTPUT_DIR")
            .unwrap_or_else(|_| "/workspace/outputs".into())
            .into();

        let generation = GenerationDefaults {
            steps: parse_var("DEFAULT_STEPS", DEFAULT_STEPS),
            width: parse_var("DEFAULT_WIDTH", DEFAULT_WIDTH),
            height: parse_var("DEFAULT_HEIGHT", DEFAULT_HEIGHT),
            guidance: parse_var("DEFAULT_GUIDANCE", DEFAULT_GUIDANCE),
        };
        if let Err(e) = generation.validate() {
            panic!("Invalid generation defaults: {e}");
        }

        let inference_url = std::env::var("INFERENCE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());
        let inference_device =
            std::env::var("INFERENCE_DEVICE").unwrap_or_else(|_| "cuda".into());

        let inference_model = std::env::var("INFERENCE_MODEL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|v| v.parse().unwrap_or_else(|e| panic!("INFERENCE_MODEL: {e}")));

        let job_retention_hours = std::env::var("JOB_RETENTION_HOURS")
            .ok()
            .map(|v| parse_retention_hours(&v).unwrap_or_else(|e| panic!("{e}")));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            output_dir,
            generation,
            inference_url,
            inference_device,
            inference_model,
            job_retention_hours,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

/// Parse `JOB_RETENTION_HOURS`, accepting `1..=MAX_RETENTION_HOURS`.
pub fn parse_retention_hours(raw: &str) -> Result<i64, String> {
    let hours: i64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("JOB_RETENTION_HOURS must be an integer, got '{raw}'"))?;
    if (1..=MAX_RETENTION_HOURS).contains(&hours) {
        Ok(hours)
    } else {
        Err(format!(
            "JOB_RETENTION_HOURS must be between 1 and {MAX_RETENTION_HOURS}, got {hours}"
        ))
    }
}
