//! Job records and the job state machine.
//!
//! ```text
//! Pending -> Processing -> Complete
//!                      \-> Error
//! ```
//!
//! Every record enters as `Pending` and is moved exactly twice by the
//! worker. Terminal states never transition again.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::generation::GenerationParams;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Complete,
    Error,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }

    /// `Complete` and `Error` are final.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }

    /// Whether moving from `self` to `next` is a legal edge.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Complete)
                | (Self::Processing, Self::Error)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One accepted generation request, tracked from submission to a terminal
/// state.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub params: GenerationParams,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    /// Handle to the stored artifact. Only set once `Complete`.
    pub result_reference: Option<String>,
    /// Failure description. Only set once `Error`.
    pub error_detail: Option<String>,
}

impl Job {
    /// A fresh `Pending` record with a newly generated id.
    pub fn new(params: GenerationParams) -> Self {
        Self::with_id(JobId::new(), params)
    }

    pub fn with_id(id: JobId, params: GenerationParams) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            params,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
            result_reference: None,
            error_detail: None,
        }
    }

    pub fn mark_processing(&mut self) -> Result<(), CoreError> {
        self.transition(JobStatus::Processing)?;
        self.started_at = Some(chrono::Utc::now());
        Ok(())
    }

    pub fn mark_complete(&mut self, result_reference: String) -> Result<(), CoreError> {
        self.transition(JobStatus::Complete)?;
        self.result_reference = Some(result_reference);
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    pub fn mark_error(&mut self, detail: impl Into<String>) -> Result<(), CoreError> {
        self.transition(JobStatus::Error)?;
        self.error_detail = Some(detail.into());
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    fn transition(&mut self, next: JobStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                id: self.id.to_string(),
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
