//! Per-job progress polling and event push.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use docpress_core::config::PipelineConfig;
use docpress_core::types::JobId;
use docpress_store::JobStore;

use crate::event::ProgressEvent;
use crate::registry::{SubscriptionRegistry, WatchChannel};

/// Streams status snapshots for watched jobs.
///
/// Independent of the worker loop: it only reads the job store, so it
/// tolerates seeing a stale or mid-transition record and simply reports
/// the next snapshot on the following poll.
pub struct ProgressNotifier {
    store: Arc<dyn JobStore>,
    registry: Arc<SubscriptionRegistry>,
    poll_interval: Duration,
    idle_timeout: Duration,
}

impl ProgressNotifier {
    /// Create a notifier polling `store` with the configured cadence.
    pub fn new(store: Arc<dyn JobStore>, config: &PipelineConfig) -> Self {
        Self {
            store,
            registry: Arc::new(SubscriptionRegistry::new()),
            poll_interval: config.notifier_poll_interval,
            idle_timeout: config.notifier_idle_timeout,
        }
    }

    /// The registry of active watches, for inspection and idle sweeps.
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// Start watching `job_id`, replacing any existing watch on it.
    ///
    /// Spawns a poll task that pushes [`ProgressEvent`]s into the
    /// returned channel until the job reaches a terminal state, the
    /// watch is dropped or replaced, or the idle ceiling is hit. The
    /// channel closing is the end-of-stream signal.
    pub async fn watch(&self, job_id: impl Into<JobId>) -> mpsc::UnboundedReceiver<ProgressEvent> {
        let job_id = job_id.into();
        let (receiver, channel) = self.registry.open(job_id.clone()).await;
        tracing::debug!(job_id = %job_id, "Watch opened");

        let store = self.store.clone();
        let registry = self.registry.clone();
        let poll_interval = self.poll_interval;
        let idle_timeout = self.idle_timeout;
        tokio::spawn(async move {
            poll_job(store, registry, job_id, channel, poll_interval, idle_timeout).await;
        });

        receiver
    }

    /// Close the watch on `job_id` immediately, releasing its poll task.
    pub async fn unwatch(&self, job_id: &str) {
        self.registry.close(job_id).await;
        tracing::debug!(job_id = %job_id, "Watch closed");
    }
}

/// Poll loop for a single watch.
///
/// Exits on: terminal job state, vanished job, cancellation (unwatch or
/// replacement), an abandoned receiver, or the idle ceiling.
async fn poll_job(
    store: Arc<dyn JobStore>,
    registry: Arc<SubscriptionRegistry>,
    job_id: JobId,
    channel: WatchChannel,
    poll_interval: Duration,
    idle_timeout: Duration,
) {
    let deadline = channel.opened_at + idle_timeout;
    let mut ticker = tokio::time::interval(poll_interval);

    loop {
        tokio::select! {
            _ = channel.cancel.cancelled() => break,
            _ = ticker.tick() => {
                if tokio::time::Instant::now() >= deadline {
                    tracing::info!(job_id = %job_id, "Watch hit idle ceiling");
                    break;
                }

                match store.find_by_id(&job_id).await {
                    Err(e) => {
                        // Transient infrastructure trouble: keep polling.
                        tracing::error!(job_id = %job_id, error = %e, "Progress poll failed");
                    }
                    Ok(None) => {
                        let _ = channel.sender.send(ProgressEvent::Error {
                            job_id: job_id.clone(),
                            message: "Job not found".to_string(),
                        });
                        break;
                    }
                    Ok(Some(job)) => {
                        if channel.sender.send(ProgressEvent::status(&job)).is_err() {
                            // Receiver dropped: the watch was abandoned.
                            break;
                        }
                        if job.status.is_terminal() {
                            let _ = channel.sender.send(ProgressEvent::terminal(&job));
                            break;
                        }
                    }
                }
            }
        }
    }

    registry.release(&job_id, channel.generation).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use docpress_core::job::{Job, Operation};
    use docpress_store::InMemoryJobStore;

    use super::*;

    fn fast_config() -> PipelineConfig {
        PipelineConfig {
            notifier_poll_interval: Duration::from_millis(20),
            notifier_idle_timeout: Duration::from_secs(300),
            ..PipelineConfig::default()
        }
    }

    fn job(id: &str) -> Job {
        Job::new(
            Some(id.to_string()),
            Operation::Split,
            vec!["in.pdf".to_string()],
            serde_json::Map::new(),
        )
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn vanished_job_emits_error_and_closes() {
        let store = Arc::new(InMemoryJobStore::new());
        let notifier = ProgressNotifier::new(store, &fast_config());

        let mut rx = notifier.watch("ghost").await;
        assert_matches!(rx.recv().await, Some(ProgressEvent::Error { .. }));
        // Stream ends after the error event.
        assert_eq!(rx.recv().await, None);
        assert_eq!(notifier.registry().count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_job_closes_stream_after_terminal_event() {
        let store = Arc::new(InMemoryJobStore::new());
        let mut j = job("j1");
        j.start().unwrap();
        j.complete("result/j1.pdf").unwrap();
        store.save(j).await.unwrap();

        let notifier = ProgressNotifier::new(store, &fast_config());
        let mut rx = notifier.watch("j1").await;

        // Snapshot of the terminal record, then the closing event.
        assert_matches!(rx.recv().await, Some(ProgressEvent::Status { .. }));
        let terminal = rx.recv().await.unwrap();
        assert_matches!(
            terminal,
            ProgressEvent::Terminal { ref result_file, .. }
                if result_file.as_deref() == Some("result/j1.pdf")
        );
        assert_eq!(rx.recv().await, None);
        assert_eq!(notifier.registry().count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unwatch_closes_the_stream_early() {
        let store = Arc::new(InMemoryJobStore::new());
        store.save(job("j1")).await.unwrap();

        let notifier = ProgressNotifier::new(store, &fast_config());
        let mut rx = notifier.watch("j1").await;

        // Consume the first snapshot, then close.
        assert_matches!(rx.recv().await, Some(ProgressEvent::Status { .. }));
        notifier.unwatch("j1").await;

        // Drain whatever raced in; the channel must end.
        while rx.recv().await.is_some() {}
        assert_eq!(notifier.registry().count().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn second_watch_replaces_the_first() {
        let store = Arc::new(InMemoryJobStore::new());
        store.save(job("j1")).await.unwrap();

        let notifier = ProgressNotifier::new(store, &fast_config());
        let mut first = notifier.watch("j1").await;
        let mut second = notifier.watch("j1").await;

        // The first subscriber's stream ends; the second receives events.
        while first.recv().await.is_some() {}
        assert_matches!(second.recv().await, Some(ProgressEvent::Status { .. }));
        assert_eq!(notifier.registry().count().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn idle_ceiling_force_closes_a_watch() {
        let store = Arc::new(InMemoryJobStore::new());
        store.save(job("j1")).await.unwrap();

        let config = PipelineConfig {
            notifier_poll_interval: Duration::from_secs(2),
            notifier_idle_timeout: Duration::from_secs(10),
            ..PipelineConfig::default()
        };
        let notifier = ProgressNotifier::new(store, &config);
        let mut rx = notifier.watch("j1").await;

        // The job never progresses; the stream must still end.
        let mut snapshots = 0;
        while rx.recv().await.is_some() {
            snapshots += 1;
        }
        assert!(snapshots >= 1);
        assert_eq!(notifier.registry().count().await, 0);
    }
}
