//! Periodic eviction of finished jobs.
//!
//! Only runs when `JOB_RETENTION_HOURS` is configured. Removes `complete`
//! and `error` jobs whose completion time is older than the retention
//! period, together with their image files. Queued and running jobs are
//! never touched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use flux_worker::JobManager;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the retention loop until `cancel` is triggered.
pub async fn run(
    jobs: Arc<JobManager>,
    retention_hours: i64,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_hours,
        interval_secs = interval.as_secs(),
        "Job retention task started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job retention task stopping");
                break;
            }
            _ = ticker.tick() => {
                let Some(cutoff) = chrono::Duration::try_hours(retention_hours)
                    .and_then(|period| Utc::now().checked_sub_signed(period))
                else {
                    tracing::warn!(retention_hours, "Job retention: period out of range, skipping");
                    continue;
                };
                let evicted = jobs.evict_finished_before(cutoff).await;
                if evicted > 0 {
                    tracing::info!(evicted, "Job retention: evicted finished jobs");
                } else {
                    tracing::debug!("Job retention: nothing to evict");
                }
            }
        }
    }
}
