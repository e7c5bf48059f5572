#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use flux_core::generation::{GenerateRequest, GenerationDefaults, GenerationParams};
use flux_core::job::Job;
use flux_core::types::JobId;
use flux_inference::{GenerationError, Generator};
use flux_worker::artifacts::LocalArtifactStore;
use flux_worker::status_table::InMemoryStatusTable;
use flux_worker::JobManager;
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

pub const FAKE_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Generator that records call order and concurrency, and fails or panics
/// on request.
#[derive(Default)]
pub struct RecordingGenerator {
    pub started: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    delay: Duration,
    fail_prompts: HashSet<String>,
    panic_prompts: HashSet<String>,
    gate: Option<Semaphore>,
}

impl RecordingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, prompt: &str) -> Self {
        self.fail_prompts.insert(prompt.to_string());
        self
    }

    pub fn panicking_on(mut self, prompt: &str) -> Self {
        self.panic_prompts.insert(prompt.to_string());
        self
    }

    /// Every call waits for a permit from [`release`](Self::release).
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn started_prompts(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, params: &GenerationParams) -> Result<Vec<u8>, GenerationError> {
        self.started.lock().unwrap().push(params.prompt.clone());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_prompts.contains(&params.prompt) {
            panic!("generator exploded on {}", params.prompt);
        }
        if self.fail_prompts.contains(&params.prompt) {
            return Err(GenerationError::Backend {
                status: 500,
                body: "CUDA out of memory".into(),
            });
        }
        Ok(FAKE_PNG.to_vec())
    }

    fn model_loaded(&self) -> bool {
        true
    }

    fn accelerator_name(&self) -> String {
        "test-gpu".into()
    }
}

pub struct Harness {
    pub manager: Arc<JobManager>,
    pub worker: JoinHandle<()>,
    pub generator: Arc<RecordingGenerator>,
    pub _dir: TempDir,
}

pub async fn start(generator: RecordingGenerator) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalArtifactStore::open(dir.path()).await.unwrap();
    let generator = Arc::new(generator);

    let (manager, worker) = JobManager::start(
        Arc::new(InMemoryStatusTable::new()),
        Arc::new(store),
        generator.clone(),
        GenerationDefaults::default(),
    );

    Harness {
        manager,
        worker,
        generator,
        _dir: dir,
    }
}

pub fn request(prompt: &str) -> GenerateRequest {
    GenerateRequest {
        prompt: Some(prompt.to_string()),
        width: Some(64),
        height: Some(64),
        ..Default::default()
    }
}

/// Poll until `id` reaches a terminal state.
pub async fn wait_terminal(manager: &JobManager, id: JobId) -> Job {
    wait_until(manager, id, |job| job.status.is_terminal()).await
}

pub async fn wait_until(manager: &JobManager, id: JobId, pred: impl Fn(&Job) -> bool) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let job = manager.status(id).await.unwrap();
        if pred(&job) {
            return job;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} stuck in {}",
            job.status
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
