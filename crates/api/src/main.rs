use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use flux_inference::{Generator, InferenceClient, PlaceholderGenerator};
use flux_worker::artifacts::LocalArtifactStore;
use flux_worker::status_table::InMemoryStatusTable;
use flux_worker::JobManager;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flux_api::background::job_retention;
use flux_api::config::ServerConfig;
use flux_api::router::build_app_router;
use flux_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flux_api=debug,flux_worker=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Generator ---
    let generator: Arc<dyn Generator> = match &config.inference_url {
        Some(url) => {
            let mut client = InferenceClient::new(url.clone(), config.inference_device.clone());
            if let Some(model) = config.inference_model {
                tracing::info!(model = %model, "Requesting model from inference backend");
                client = client.with_model(model);
            }
            if client.probe().await {
                tracing::info!(api_url = %url, "Inference backend reachable");
            } else {
                tracing::warn!(api_url = %url, "Inference backend not ready; jobs will fail until it is");
            }
            Arc::new(client)
        }
        None => {
            tracing::warn!("INFERENCE_URL not set, using the placeholder generator");
            Arc::new(PlaceholderGenerator::new())
        }
    };

    // --- Artifact storage ---
    let store = LocalArtifactStore::open(&config.output_dir)
        .await
        .expect("Failed to create output directory");
    tracing::info!(output_dir = %store.root().display(), "Artifact store ready");

    // --- Job pipeline ---
    let (jobs, worker_handle) = JobManager::start(
        Arc::new(InMemoryStatusTable::new()),
        Arc::new(store),
        generator,
        config.generation,
    );

    // --- Retention ---
    let retention_cancel = CancellationToken::new();
    let retention_handle = config.job_retention_hours.map(|hours| {
        tokio::spawn(job_retention::run(
            Arc::clone(&jobs),
            hours,
            job_retention::SWEEP_INTERVAL,
            retention_cancel.clone(),
        ))
    });

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        jobs: Arc::clone(&jobs),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    retention_cancel.cancel();
    if let Some(handle) = retention_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    // Close the queue; the worker exits after its current job.
    jobs.shutdown();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, worker_handle).await.is_err() {
        tracing::warn!(
            timeout_secs = drain.as_secs(),
            "Generation worker still busy at shutdown, abandoning in-flight job"
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
