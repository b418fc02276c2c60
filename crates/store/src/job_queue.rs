//! The [`JobQueue`] contract: durable FIFO of job references.

use std::time::Duration;

use async_trait::async_trait;
use docpress_core::job::Operation;
use docpress_core::types::{JobId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::StoreResult;

/// The lightweight reference placed on the queue.
///
/// Carries just enough metadata (operation kind, enqueue time) for a
/// worker to log meaningfully without a store round trip; the full
/// record always comes from the [`JobStore`](crate::JobStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedJob {
    pub job_id: JobId,
    pub operation: Operation,
    pub enqueued_at: Timestamp,
}

impl QueuedJob {
    /// Build the queue entry for a job, stamped with the current time.
    pub fn new(job_id: impl Into<JobId>, operation: Operation) -> Self {
        Self {
            job_id: job_id.into(),
            operation,
            enqueued_at: chrono::Utc::now(),
        }
    }
}

/// Durable FIFO queue of [`QueuedJob`] references with at-least-once
/// delivery.
///
/// Consuming pops the head and moves the reference into an in-flight
/// tracking set; `acknowledge` retires it, `return_to_queue` re-appends
/// it at the **tail**. Pops are exclusive per reference — two concurrent
/// consumers never receive the same entry — which is what lets multiple
/// worker loops share one queue without partitioning.
///
/// In-flight entries whose consumer dies before acknowledging are never
/// reclaimed automatically. The set exists for operator inspection; the
/// right reclamation policy (visibility timeout vs. heartbeat) is
/// deliberately not chosen here.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a reference to the tail. Never blocks beyond store latency.
    async fn publish(&self, entry: QueuedJob) -> StoreResult<()>;

    /// Non-blocking pop from the head. `Ok(None)` when the queue is empty.
    async fn try_consume(&self) -> StoreResult<Option<QueuedJob>>;

    /// Pop from the head, blocking up to `timeout` while the queue is
    /// empty. `Ok(None)` on timeout, not an error.
    async fn consume(&self, timeout: Duration) -> StoreResult<Option<QueuedJob>>;

    /// Mark a previously consumed reference as durably finished,
    /// removing it from the in-flight set.
    async fn acknowledge(&self, entry: &QueuedJob) -> StoreResult<()>;

    /// Remove a consumed reference from the in-flight set and re-append
    /// it at the tail — a requeued job goes to the back of the line.
    async fn return_to_queue(&self, entry: QueuedJob) -> StoreResult<()>;

    /// Count of not-yet-consumed entries. Excludes in-flight references.
    async fn size(&self) -> StoreResult<usize>;
}
