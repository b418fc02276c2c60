//! The boundary to the external processing dispatcher.
//!
//! The worker loop depends on nothing but this one-method trait; the
//! mapping from an [`Operation`](docpress_core::job::Operation) to
//! concrete document-transformation behaviour lives entirely on the
//! other side of it.

use async_trait::async_trait;
use docpress_core::job::Job;

/// A processing failure, carrying a human-readable message.
///
/// Recorded verbatim as the job's `error_message`. Never retried by the
/// pipeline; retrying means submitting a fresh job.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ProcessorError {
    pub message: String,
}

impl ProcessorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Performs the requested document operation for one job.
///
/// `input_files` entries are opaque path-like references resolved by the
/// implementation's own storage collaborator. The call may take
/// arbitrarily long; the worker loop awaits it to completion even during
/// shutdown.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Execute the job's operation, returning the result file reference.
    async fn process(&self, job: &Job) -> Result<String, ProcessorError>;
}
