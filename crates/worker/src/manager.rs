//! Submission and query entry points over the job pipeline.

use std::sync::Arc;

use flux_core::error::CoreError;
use flux_core::generation::{GenerateRequest, GenerationDefaults};
use flux_core::job::{Job, JobStatus};
use flux_core::types::{JobId, Timestamp};
use flux_inference::Generator;
use tokio::task::JoinHandle;

use crate::artifacts::{ArtifactStore, StorageError};
use crate::queue::{job_queue, JobSender};
use crate::resource::GenerationResource;
use crate::status_table::StatusTable;
use crate::worker::GenerationWorker;

/// Why an artifact could not be returned.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Job not found")]
    UnknownJob,

    #[error("Image not ready")]
    NotReady(JobStatus),

    #[error("Image file not found")]
    Missing,

    #[error(transparent)]
    Storage(StorageError),
}

/// Front door for clients: creates jobs and answers status/artifact reads.
///
/// Owns the producer half of the queue; the consumer half belongs to the
/// worker spawned by [`JobManager::start`].
pub struct JobManager {
    table: Arc<dyn StatusTable>,
    queue: JobSender,
    store: Arc<dyn ArtifactStore>,
    resource: Arc<GenerationResource>,
    defaults: GenerationDefaults,
}

impl JobManager {
    /// Build the pipeline and spawn its worker.
    ///
    /// Returns the manager and the worker's join handle. The worker exits
    /// after [`shutdown`](Self::shutdown) is called.
    pub fn start(
        table: Arc<dyn StatusTable>,
        store: Arc<dyn ArtifactStore>,
        generator: Arc<dyn Generator>,
        defaults: GenerationDefaults,
    ) -> (Arc<Self>, JoinHandle<()>) {
        let (sender, receiver) = job_queue();
        let resource = Arc::new(GenerationResource::new(generator));

        let worker = GenerationWorker::new(
            Arc::clone(&table),
            Arc::clone(&resource),
            Arc::clone(&store),
        );
        let handle = worker.spawn(receiver);

        let manager = Arc::new(Self {
            table,
            queue: sender,
            store,
            resource,
            defaults,
        });
        (manager, handle)
    }

    /// Validate `request`, record a `Pending` job and queue it.
    ///
    /// Returns as soon as the job is queued; generation happens later on
    /// the worker.
    pub async fn submit(&self, request: GenerateRequest) -> Result<Job, CoreError> {
        let params = request.resolve(&self.defaults)?;

        let job = Job::new(params);
        self.table.put(job.clone()).await?;
        if let Err(e) = self.queue.enqueue(job.id) {
            // Never leave a Pending record that no worker will pick up.
            self.table.remove(job.id).await;
            return Err(CoreError::Internal(e.to_string()));
        }

        tracing::info!(job_id = %job.id, prompt = %job.params.prompt, "Job submitted");
        Ok(job)
    }

    /// Current record for `id`.
    pub async fn status(&self, id: JobId) -> Result<Job, CoreError> {
        self.table.get(id).await
    }

    /// Artifact bytes for a `Complete` job.
    pub async fn artifact(&self, id: JobId) -> Result<Vec<u8>, ArtifactError> {
        let job = self
            .table
            .get(id)
            .await
            .map_err(|_| ArtifactError::UnknownJob)?;

        if job.status != JobStatus::Complete {
            return Err(ArtifactError::NotReady(job.status));
        }

        let reference = job.result_reference.ok_or(ArtifactError::Missing)?;
        match self.store.load(&reference).await {
            Ok(bytes) => Ok(bytes),
            Err(StorageError::Missing(_)) => Err(ArtifactError::Missing),
            Err(e) => Err(ArtifactError::Storage(e)),
        }
    }

    /// Drop terminal jobs that finished before `cutoff` along with their
    /// artifacts. Returns how many jobs were removed.
    pub async fn evict_finished_before(&self, cutoff: Timestamp) -> usize {
        let removed = self.table.remove_terminal_before(cutoff).await;
        for job in &removed {
            if let Some(reference) = &job.result_reference {
                if let Err(e) = self.store.remove(reference).await {
                    tracing::warn!(job_id = %job.id, error = %e, "Failed to remove artifact");
                }
            }
        }
        removed.len()
    }

    pub async fn job_count(&self) -> usize {
        self.table.len().await
    }

    pub fn model_loaded(&self) -> bool {
        self.resource.model_loaded()
    }

    pub fn accelerator_name(&self) -> String {
        self.resource.accelerator_name()
    }

    pub fn defaults(&self) -> &GenerationDefaults {
        &self.defaults
    }

    /// Close the queue so the worker stops after its current job.
    pub fn shutdown(&self) {
        self.queue.close();
    }
}
