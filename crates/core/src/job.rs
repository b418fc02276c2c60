//! The [`Job`] entity and its lifecycle state machine.
//!
//! A job is created `Pending`, picked up by a worker (`Processing`), and
//! ends in exactly one terminal state: `Completed`, `Failed`, or
//! `Cancelled`. Every transition is guarded here; the store persists
//! whatever this module allows and nothing else.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// The closed set of document operations the pipeline accepts.
///
/// The mapping from an operation to concrete behaviour lives entirely in
/// the external processing dispatcher; the pipeline only routes and
/// records these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Merge,
    Split,
    Rotate,
    Compress,
    Watermark,
    Protect,
    Unlock,
    ExtractPages,
}

impl Operation {
    /// Stable wire/log name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Merge => "MERGE",
            Operation::Split => "SPLIT",
            Operation::Rotate => "ROTATE",
            Operation::Compress => "COMPRESS",
            Operation::Watermark => "WATERMARK",
            Operation::Protect => "PROTECT",
            Operation::Unlock => "UNLOCK",
            Operation::ExtractPages => "EXTRACT_PAGES",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MERGE" => Ok(Operation::Merge),
            "SPLIT" => Ok(Operation::Split),
            "ROTATE" => Ok(Operation::Rotate),
            "COMPRESS" => Ok(Operation::Compress),
            "WATERMARK" => Ok(Operation::Watermark),
            "PROTECT" => Ok(Operation::Protect),
            "UNLOCK" => Ok(Operation::Unlock),
            "EXTRACT_PAGES" => Ok(Operation::ExtractPages),
            other => Err(CoreError::Validation(format!(
                "Unknown operation: \"{other}\""
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Job execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether no further transitions are valid from this status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "PROCESSING" => Ok(JobStatus::Processing),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            "CANCELLED" => Ok(JobStatus::Cancelled),
            other => Err(CoreError::Validation(format!(
                "Unknown job status: \"{other}\""
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A unit of requested document work and its lifecycle record.
///
/// `id`, `operation`, `input_files`, and `options` are fixed at
/// construction. The mutable fields (`status`, `progress`, result/error,
/// timestamps) change only through the transition methods below, and the
/// store is the single source of truth between transitions — components
/// re-load, mutate, and save rather than caching a long-lived copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub operation: Operation,
    /// Ordered input file references, opaque to the pipeline. Non-empty.
    pub input_files: Vec<String>,
    /// Operation-specific options, e.g. rotation angle or password.
    pub options: serde_json::Map<String, serde_json::Value>,
    pub status: JobStatus,
    /// Percentage in `0..=100`.
    pub progress: i16,
    /// Set only when the job is `Failed`.
    pub error_message: Option<String>,
    /// Result file reference, set only when the job is `Completed`.
    pub result_file: Option<String>,
    pub created_at: Timestamp,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
}

impl Job {
    /// Create a new `Pending` job.
    ///
    /// When `id` is `None` a UUIDv4 is generated. `input_files` must be
    /// non-empty.
    pub fn new(
        id: Option<JobId>,
        operation: Operation,
        input_files: Vec<String>,
        options: serde_json::Map<String, serde_json::Value>,
    ) -> CoreResult<Self> {
        if input_files.is_empty() {
            return Err(CoreError::Validation(
                "A job must have at least one input file".to_string(),
            ));
        }

        Ok(Self {
            id: id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            operation,
            input_files,
            options,
            status: JobStatus::Pending,
            progress: 0,
            error_message: None,
            result_file: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            completed_at: None,
        })
    }

    /// Begin execution: `Pending` → `Processing`. Sets `started_at`.
    pub fn start(&mut self) -> CoreResult<()> {
        if self.status != JobStatus::Pending {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                action: "start",
            });
        }
        self.status = JobStatus::Processing;
        self.started_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Finish successfully: `Processing` → `Completed`.
    ///
    /// Records the result file reference and forces `progress` to 100.
    pub fn complete(&mut self, result_file: impl Into<String>) -> CoreResult<()> {
        if self.status != JobStatus::Processing {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                action: "complete",
            });
        }
        self.status = JobStatus::Completed;
        self.result_file = Some(result_file.into());
        self.progress = 100;
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Finish unsuccessfully: any non-terminal status → `Failed`.
    ///
    /// Accepted from `Pending` as well as `Processing` so a stuck job can
    /// be failed without ever having been started.
    pub fn fail(&mut self, message: impl Into<String>) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                action: "fail",
            });
        }
        self.status = JobStatus::Failed;
        self.error_message = Some(message.into());
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Cancel: `Pending` or `Processing` → `Cancelled`.
    ///
    /// Cancelling changes the stored state only; it does not interrupt a
    /// dispatch already in progress. A worker that later tries to
    /// complete or fail the job sees an illegal transition and must log
    /// and continue.
    pub fn cancel(&mut self) -> CoreResult<()> {
        if self.status.is_terminal() {
            return Err(CoreError::IllegalTransition {
                from: self.status,
                action: "cancel",
            });
        }
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(chrono::Utc::now());
        Ok(())
    }

    /// Update the progress percentage.
    ///
    /// Values outside `0..=100` are rejected and leave the prior value
    /// unchanged.
    pub fn set_progress(&mut self, percent: i16) -> CoreResult<()> {
        if !(0..=100).contains(&percent) {
            return Err(CoreError::InvalidProgress(percent));
        }
        self.progress = percent;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
