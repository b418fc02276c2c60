//! Domain error taxonomy for the job pipeline.

use crate::job::JobStatus;

/// Errors raised by the domain layer.
///
/// Per-job conditions only. Infrastructure failures (store or queue
/// unreachable) live in `docpress-store` as `StoreError`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A state-machine rule was violated, e.g. completing a job that is
    /// not in `Processing`. Always a programming or race error; callers
    /// in the worker loop log and absorb it.
    #[error("illegal transition: cannot {action} a {from} job")]
    IllegalTransition {
        /// Status the job was in when the transition was attempted.
        from: JobStatus,
        /// The attempted transition, e.g. `"start"` or `"complete"`.
        action: &'static str,
    },

    /// A progress value outside the `0..=100` range was rejected.
    #[error("progress must be between 0 and 100, got {0}")]
    InvalidProgress(i16),

    /// A constructor-level validation failure with a human-readable message.
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Convenience alias for domain-layer results.
pub type CoreResult<T> = Result<T, CoreError>;
