//! Unbounded FIFO hand-off of job ids from submission to the worker.

use flux_core::types::JobId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Returned by [`JobSender::enqueue`] once the queue has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Job queue is closed")]
pub struct QueueClosed;

/// Producer half. Cheap to clone.
#[derive(Clone)]
pub struct JobSender {
    tx: mpsc::UnboundedSender<JobId>,
    closed: CancellationToken,
}

/// Consumer half. Owned by the single worker.
pub struct JobReceiver {
    rx: mpsc::UnboundedReceiver<JobId>,
    closed: CancellationToken,
}

/// Create a connected sender/receiver pair.
pub fn job_queue() -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let closed = CancellationToken::new();
    (
        JobSender {
            tx,
            closed: closed.clone(),
        },
        JobReceiver { rx, closed },
    )
}

impl JobSender {
    /// Append `id` to the tail. Never blocks.
    pub fn enqueue(&self, id: JobId) -> Result<(), QueueClosed> {
        if self.closed.is_cancelled() {
            return Err(QueueClosed);
        }
        self.tx.send(id).map_err(|_| QueueClosed)
    }

    /// Close the queue. A blocked [`JobReceiver::dequeue`] returns `None`
    /// and ids still waiting in the channel are dropped.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled() || self.tx.is_closed()
    }
}

impl JobReceiver {
    /// Wait for the next id in enqueue order. `None` means the queue was
    /// closed (or every sender dropped) and the caller should stop.
    pub async fn dequeue(&mut self) -> Option<JobId> {
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => None,
            id = self.rx.recv() => id,
        }
    }
}
