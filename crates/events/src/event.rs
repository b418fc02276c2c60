//! Named progress events pushed to a watching client.

use serde::{Deserialize, Serialize};

use docpress_core::job::{Job, JobStatus};
use docpress_core::types::JobId;

/// One event on a job watch stream.
///
/// Serializes with an `event` tag (`status` / `terminal` / `error`) so
/// the transport layer can map it straight onto SSE event names or a
/// WebSocket message `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Periodic snapshot of a live job.
    Status {
        job_id: JobId,
        status: JobStatus,
        progress: i16,
    },
    /// Final snapshot; the stream closes after this.
    Terminal {
        job_id: JobId,
        status: JobStatus,
        result_file: Option<String>,
        error_message: Option<String>,
    },
    /// The watched job disappeared from the store; the stream closes.
    Error { job_id: JobId, message: String },
}

impl ProgressEvent {
    /// Snapshot event for a live (non-terminal) job.
    pub fn status(job: &Job) -> Self {
        ProgressEvent::Status {
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress,
        }
    }

    /// Closing event for a job that reached a terminal state.
    pub fn terminal(job: &Job) -> Self {
        ProgressEvent::Terminal {
            job_id: job.id.clone(),
            status: job.status,
            result_file: job.result_file.clone(),
            error_message: job.error_message.clone(),
        }
    }

    /// The stream-transport event name.
    pub fn name(&self) -> &'static str {
        match self {
            ProgressEvent::Status { .. } => "status",
            ProgressEvent::Terminal { .. } => "terminal",
            ProgressEvent::Error { .. } => "error",
        }
    }
}
