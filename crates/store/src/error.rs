//! Infrastructure error type shared by the store and queue contracts.

/// A storage-layer failure.
///
/// Distinct from "not found", which is a normal `Ok(None)` result. The
/// worker loop treats every `StoreError` as transient: log, sleep one
/// poll interval, retry.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or returned a failure.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// `find_all` was called with a page size of zero.
    #[error("page size must be at least 1")]
    InvalidPageSize,
}

/// Convenience alias for store and queue results.
pub type StoreResult<T> = Result<T, StoreError>;
