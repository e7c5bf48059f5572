//! Shared job id -> record mapping.

use std::collections::HashMap;

use async_trait::async_trait;
use flux_core::error::CoreError;
use flux_core::job::Job;
use flux_core::types::{JobId, Timestamp};
use tokio::sync::RwLock;

/// In-place transition applied by [`StatusTable::update`].
pub type JobMutator = Box<dyn FnOnce(&mut Job) -> Result<(), CoreError> + Send>;

/// Key-value store of job records.
///
/// Only the submission path inserts and only the worker updates, so a
/// single-writer-per-key discipline holds without per-key locks.
#[async_trait]
pub trait StatusTable: Send + Sync {
    /// Insert a new record. Fails with `DuplicateKey` if the id exists.
    async fn put(&self, job: Job) -> Result<(), CoreError>;

    /// Snapshot of the current record.
    async fn get(&self, id: JobId) -> Result<Job, CoreError>;

    /// Apply `mutator` atomically and return the updated record. If the
    /// mutator fails the stored record is left untouched.
    async fn update(&self, id: JobId, mutator: JobMutator) -> Result<Job, CoreError>;

    /// Delete a record regardless of its status. Used to withdraw a job
    /// that was recorded but never queued.
    async fn remove(&self, id: JobId) -> Option<Job>;

    /// Remove terminal records that completed before `cutoff`.
    async fn remove_terminal_before(&self, cutoff: Timestamp) -> Vec<Job>;

    async fn len(&self) -> usize;
}

/// Process-local [`StatusTable`] behind a `RwLock`.
#[derive(Default)]
pub struct InMemoryStatusTable {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryStatusTable {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatusTable for InMemoryStatusTable {
    async fn put(&self, job: Job) -> Result<(), CoreError> {
        let mut jobs = self.jobs.write().await;
        if jobs.contains_key(&job.id) {
            return Err(CoreError::DuplicateKey {
                entity: "Job",
                id: job.id.to_string(),
            });
        }
        jobs.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Job, CoreError> {
        self.jobs
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn update(&self, id: JobId, mutator: JobMutator) -> Result<Job, CoreError> {
        let mut jobs = self.jobs.write().await;
        let current = jobs.get_mut(&id).ok_or_else(|| not_found(id))?;

        let mut next = current.clone();
        mutator(&mut next)?;
        *current = next.clone();
        Ok(next)
    }

    async fn remove(&self, id: JobId) -> Option<Job> {
        self.jobs.write().await.remove(&id)
    }

    async fn remove_terminal_before(&self, cutoff: Timestamp) -> Vec<Job> {
        let mut jobs = self.jobs.write().await;
        let expired: Vec<JobId> = jobs
            .values()
            .filter(|job| {
                job.status.is_terminal() && job.completed_at.is_some_and(|at| at < cutoff)
            })
            .map(|job| job.id)
            .collect();

        expired
            .into_iter()
            .filter_map(|id| jobs.remove(&id))
            .collect()
    }

    async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

fn not_found(id: JobId) -> CoreError {
    CoreError::NotFound {
        entity: "Job",
        id: id.to_string(),
    }
}
