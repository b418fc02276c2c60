//! The [`JobStore`] contract: durable job-id → job record mapping.

use async_trait::async_trait;
use docpress_core::job::Job;

use crate::error::StoreResult;

/// Durable key-value store of [`Job`] records, keyed by job id.
///
/// The store is the single source of truth for a job between
/// transitions; the worker loop and the progress notifier coordinate
/// purely through it. `save` is an upsert with last-write-wins
/// semantics — no optimistic locking, because each job is owned by
/// exactly one worker between `start()` and its terminal transition.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert or replace the record for `job.id`. Returns the stored job.
    async fn save(&self, job: Job) -> StoreResult<Job>;

    /// Look up a job by id. Absence is `Ok(None)`, not an error.
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Job>>;

    /// Page through all stored jobs.
    ///
    /// `page` is zero-based; `page_size` must be at least 1. Ordering is
    /// stable for a given store snapshot but not globally sorted.
    async fn find_all(&self, page: usize, page_size: usize) -> StoreResult<Vec<Job>>;

    /// Remove a job record. Removing an unknown id is a no-op.
    async fn delete(&self, id: &str) -> StoreResult<()>;

    /// Whether a record exists for `id`.
    async fn exists(&self, id: &str) -> StoreResult<bool>;
}
