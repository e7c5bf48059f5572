//! The single background task that executes queued jobs.
//!
//! For every dequeued id: mark `Processing`, generate under the resource
//! guard, store the artifact, then mark `Complete` or `Error`. A failing
//! job is recorded and the loop moves on; nothing a job does can end the
//! loop short of the queue closing.

use std::sync::Arc;

use flux_core::job::Job;
use flux_core::types::JobId;
use tokio::task::JoinHandle;

use crate::artifacts::{ArtifactStore, StorageError};
use crate::queue::JobReceiver;
use crate::resource::{GenerationFailure, GenerationResource};
use crate::status_table::StatusTable;

/// Everything that can turn a `Processing` job into `Error`.
#[derive(Debug, thiserror::Error)]
pub enum JobFailure {
    #[error(transparent)]
    Generation(#[from] GenerationFailure),

    #[error("Failed to store image: {0}")]
    Storage(#[from] StorageError),
}

pub struct GenerationWorker {
    table: Arc<dyn StatusTable>,
    resource: Arc<GenerationResource>,
    store: Arc<dyn ArtifactStore>,
}

impl GenerationWorker {
    pub fn new(
        table: Arc<dyn StatusTable>,
        resource: Arc<GenerationResource>,
        store: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            table,
            resource,
            store,
        }
    }

    /// Spawn [`run`](Self::run) on the current Tokio runtime.
    pub fn spawn(self, queue: JobReceiver) -> JoinHandle<()> {
        tokio::spawn(self.run(queue))
    }

    /// Drain `queue` until it is closed.
    pub async fn run(self, mut queue: JobReceiver) {
        tracing::info!("Generation worker started");

        while let Some(id) = queue.dequeue().await {
            self.process(id).await;
        }

        tracing::info!("Generation worker stopped: job queue closed");
    }

    async fn process(&self, id: JobId) {
        let job = match self
            .table
            .update(id, Box::new(|job: &mut Job| job.mark_processing()))
            .await
        {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(job_id = %id, error = %e, "Cannot start dequeued job");
                return;
            }
        };

        tracing::info!(
            job_id = %id,
            steps = job.params.steps,
            width = job.params.width,
            height = job.params.height,
            "Job processing",
        );

        let outcome = self.execute(&job).await;

        let recorded = match outcome {
            Ok(reference) => {
                tracing::info!(job_id = %id, reference = %reference, "Job complete");
                self.table
                    .update(id, Box::new(move |job: &mut Job| job.mark_complete(reference)))
                    .await
            }
            Err(failure) => {
                let detail = failure.to_string();
                tracing::warn!(job_id = %id, error = %detail, "Job failed");
                self.table
                    .update(id, Box::new(move |job: &mut Job| job.mark_error(detail)))
                    .await
            }
        };

        if let Err(e) = recorded {
            tracing::error!(job_id = %id, error = %e, "Failed to record job outcome");
        }
    }

    async fn execute(&self, job: &Job) -> Result<String, JobFailure> {
        let bytes = self.resource.generate(&job.params).await?;
        let reference = self.store.store(job.id, &bytes).await?;
        Ok(reference)
    }
}
