//! In-process implementations of the store and queue contracts.
//!
//! Backed by tokio-synchronised collections; designed to be wrapped in
//! `Arc` and shared between producers, worker loops, and the progress
//! notifier. These are the implementations the test suites and
//! single-node deployments run on.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify, RwLock};

use docpress_core::job::Job;
use docpress_core::types::JobId;

use crate::error::{StoreError, StoreResult};
use crate::job_queue::{JobQueue, QueuedJob};
use crate::job_store::JobStore;

// ---------------------------------------------------------------------------
// InMemoryJobStore
// ---------------------------------------------------------------------------

/// Map contents plus insertion order, so pagination stays stable.
#[derive(Default)]
struct StoreInner {
    jobs: HashMap<JobId, Job>,
    /// Ids in first-insertion order. Upserts do not move an id.
    order: Vec<JobId>,
}

/// In-memory [`JobStore`] with insertion-order pagination.
#[derive(Default)]
pub struct InMemoryJobStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryJobStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn save(&self, job: Job) -> StoreResult<Job> {
        let mut inner = self.inner.write().await;
        if !inner.jobs.contains_key(&job.id) {
            inner.order.push(job.id.clone());
        }
        inner.jobs.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Job>> {
        Ok(self.inner.read().await.jobs.get(id).cloned())
    }

    async fn find_all(&self, page: usize, page_size: usize) -> StoreResult<Vec<Job>> {
        if page_size == 0 {
            return Err(StoreError::InvalidPageSize);
        }
        let inner = self.inner.read().await;
        let start = page.saturating_mul(page_size);
        let jobs = inner
            .order
            .iter()
            .skip(start)
            .take(page_size)
            .filter_map(|id| inner.jobs.get(id).cloned())
            .collect();
        Ok(jobs)
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner.jobs.remove(id).is_some() {
            inner.order.retain(|entry| entry != id);
        }
        Ok(())
    }

    async fn exists(&self, id: &str) -> StoreResult<bool> {
        Ok(self.inner.read().await.jobs.contains_key(id))
    }
}

// ---------------------------------------------------------------------------
// InMemoryJobQueue
// ---------------------------------------------------------------------------

/// Pending entries and the in-flight id set, under one lock so a pop
/// and its tracking insert form a single critical section.
#[derive(Default)]
struct QueueInner {
    entries: VecDeque<QueuedJob>,
    in_flight: HashSet<JobId>,
}

/// In-memory [`JobQueue`]: a FIFO deque plus the in-flight id set.
///
/// `consume` blocks on a [`Notify`] that `publish` and `return_to_queue`
/// signal, so an idle worker wakes as soon as work arrives instead of
/// spinning.
#[derive(Default)]
pub struct InMemoryJobQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
}

impl InMemoryJobQueue {
    /// Create a new, empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of consumed-but-unsettled references, for operator
    /// inspection. Entries here are never reclaimed automatically.
    pub async fn in_flight_len(&self) -> usize {
        self.inner.lock().await.in_flight.len()
    }

    /// Pop the head and move it into the in-flight set.
    ///
    /// Both happen under one lock with no await point in between:
    /// callers race this future against shutdown in `select!`, and a
    /// drop between the pop and the track would lose the entry from
    /// both the queue and the in-flight set.
    async fn pop_tracked(&self) -> Option<QueuedJob> {
        let mut inner = self.inner.lock().await;
        let entry = inner.entries.pop_front();
        if let Some(ref popped) = entry {
            inner.in_flight.insert(popped.job_id.clone());
        }
        entry
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn publish(&self, entry: QueuedJob) -> StoreResult<()> {
        self.inner.lock().await.entries.push_back(entry);
        self.notify.notify_one();
        Ok(())
    }

    async fn try_consume(&self) -> StoreResult<Option<QueuedJob>> {
        Ok(self.pop_tracked().await)
    }

    async fn consume(&self, timeout: Duration) -> StoreResult<Option<QueuedJob>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking, so a publish that lands
            // between the check and the await still wakes us.
            let notified = self.notify.notified();

            if let Some(entry) = self.pop_tracked().await {
                return Ok(Some(entry));
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            if tokio::time::timeout(deadline - now, notified).await.is_err() {
                // Timed out waiting; one last non-blocking look.
                return Ok(self.pop_tracked().await);
            }
        }
    }

    async fn acknowledge(&self, entry: &QueuedJob) -> StoreResult<()> {
        let removed = self.inner.lock().await.in_flight.remove(&entry.job_id);
        if !removed {
            tracing::debug!(job_id = %entry.job_id, "Acknowledge for unknown in-flight entry");
        }
        Ok(())
    }

    async fn return_to_queue(&self, entry: QueuedJob) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.in_flight.remove(&entry.job_id);
        inner.entries.push_back(entry);
        drop(inner);
        self.notify.notify_one();
        Ok(())
    }

    async fn size(&self) -> StoreResult<usize> {
        Ok(self.inner.lock().await.entries.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
