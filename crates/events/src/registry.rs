//! Bookkeeping for active job watches.
//!
//! An explicit registry object rather than a process-wide map: the
//! notifier owns one instance, and idle-sweeping is testable without
//! spinning up any poll tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use docpress_core::types::JobId;

use crate::event::ProgressEvent;

/// The poll task's half of a watch: where to push events, when the
/// watch was opened, and the token that force-closes it.
pub struct WatchChannel {
    pub sender: mpsc::UnboundedSender<ProgressEvent>,
    pub cancel: CancellationToken,
    pub opened_at: tokio::time::Instant,
    /// Distinguishes this watch from a later one on the same job id.
    pub generation: u64,
}

struct Entry {
    cancel: CancellationToken,
    opened_at: tokio::time::Instant,
    generation: u64,
}

/// At most one active subscription per job id.
///
/// Opening a watch for an id that already has one closes the first
/// subscriber's channel and cancels its poll task — a deliberate
/// replace, not a fan-out.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<HashMap<JobId, Entry>>,
    next_generation: AtomicU64,
}

impl SubscriptionRegistry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a watch on `job_id`, replacing any existing one.
    ///
    /// Returns the subscriber's receiver and the [`WatchChannel`] the
    /// poll task drives.
    pub async fn open(
        &self,
        job_id: JobId,
    ) -> (mpsc::UnboundedReceiver<ProgressEvent>, WatchChannel) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let opened_at = tokio::time::Instant::now();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let previous = self.entries.write().await.insert(
            job_id.clone(),
            Entry {
                cancel: cancel.clone(),
                opened_at,
                generation,
            },
        );
        if let Some(previous) = previous {
            tracing::debug!(job_id = %job_id, "Replacing existing watch");
            previous.cancel.cancel();
        }

        (
            receiver,
            WatchChannel {
                sender,
                cancel,
                opened_at,
                generation,
            },
        )
    }

    /// Close a watch early, cancelling its poll task. Unknown ids are a
    /// no-op.
    pub async fn close(&self, job_id: &str) {
        if let Some(entry) = self.entries.write().await.remove(job_id) {
            entry.cancel.cancel();
        }
    }

    /// Drop the entry for a finished poll task — but only if it still
    /// belongs to that task, so a replacement watch is left untouched.
    pub async fn release(&self, job_id: &str, generation: u64) {
        let mut entries = self.entries.write().await;
        if entries
            .get(job_id)
            .is_some_and(|entry| entry.generation == generation)
        {
            entries.remove(job_id);
        }
    }

    /// Force-close every watch open longer than `max_age`. Returns how
    /// many were closed.
    pub async fn sweep_idle(&self, max_age: Duration) -> usize {
        let now = tokio::time::Instant::now();
        let mut entries = self.entries.write().await;
        let expired: Vec<JobId> = entries
            .iter()
            .filter(|(_, entry)| now.duration_since(entry.opened_at) > max_age)
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            if let Some(entry) = entries.remove(id) {
                tracing::info!(job_id = %id, "Idle watch force-closed");
                entry.cancel.cancel();
            }
        }
        expired.len()
    }

    /// Number of active watches.
    pub async fn count(&self) -> usize {
        self.entries.read().await.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
