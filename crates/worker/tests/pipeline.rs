//! End-to-end pipeline tests: producer → store → queue → worker loop →
//! terminal state, with a progress watch riding alongside.
//!
//! Runs entirely on the in-memory store and queue with stub processors,
//! under paused tokio time so poll intervals cost nothing.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use docpress_core::config::PipelineConfig;
use docpress_core::error::CoreError;
use docpress_core::job::{Job, JobStatus, Operation};
use docpress_events::{ProgressEvent, ProgressNotifier};
use docpress_store::{InMemoryJobQueue, InMemoryJobStore, JobQueue, JobStore, QueuedJob};
use docpress_worker::{Processor, ProcessorError, WorkerLoop, WorkerPool};

/// Capture worker logs when a test runs with `RUST_LOG` set.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Processor that succeeds after an optional simulated work duration.
struct StubProcessor {
    outcome: Result<String, String>,
    work_duration: Duration,
}

impl StubProcessor {
    fn ok(result_file: &str) -> Self {
        Self {
            outcome: Ok(result_file.to_string()),
            work_duration: Duration::ZERO,
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            outcome: Err(message.to_string()),
            work_duration: Duration::ZERO,
        }
    }

    fn slow(result_file: &str, work_duration: Duration) -> Self {
        Self {
            outcome: Ok(result_file.to_string()),
            work_duration,
        }
    }
}

#[async_trait]
impl Processor for StubProcessor {
    async fn process(&self, _job: &Job) -> Result<String, ProcessorError> {
        if self.work_duration > Duration::ZERO {
            tokio::time::sleep(self.work_duration).await;
        }
        self.outcome.clone().map_err(ProcessorError::new)
    }
}

fn merge_job(id: &str) -> Job {
    Job::new(
        Some(id.to_string()),
        Operation::Merge,
        vec!["a.pdf".to_string(), "b.pdf".to_string()],
        serde_json::Map::new(),
    )
    .expect("valid job")
}

/// Producer contract: save first, then publish the reference.
async fn submit(store: &dyn JobStore, queue: &dyn JobQueue, job: Job) {
    let entry = QueuedJob::new(job.id.clone(), job.operation);
    store.save(job).await.expect("save");
    queue.publish(entry).await.expect("publish");
}

/// Run one worker loop until the stored job for `id` is terminal.
async fn run_worker_until_terminal(
    store: Arc<InMemoryJobStore>,
    queue: Arc<InMemoryJobQueue>,
    processor: Arc<dyn Processor>,
    id: &str,
) -> Job {
    let worker = WorkerLoop::new(store.clone(), queue, processor)
        .with_poll_interval(Duration::from_millis(50));
    let cancel = CancellationToken::new();
    let handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { worker.run(cancel).await })
    };

    let job = loop {
        if let Some(job) = store.find_by_id(id).await.expect("store reachable") {
            if job.status.is_terminal() {
                break job;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    cancel.cancel();
    handle.await.expect("worker task");
    job
}

// ---------------------------------------------------------------------------
// Test: successful merge job runs to COMPLETED
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn merge_job_runs_to_completed() {
    init_tracing();
    let store = Arc::new(InMemoryJobStore::new());
    let queue = Arc::new(InMemoryJobQueue::new());

    submit(store.as_ref(), queue.as_ref(), merge_job("j1")).await;

    let done = run_worker_until_terminal(
        store.clone(),
        queue.clone(),
        Arc::new(StubProcessor::ok("result/j1.pdf")),
        "j1",
    )
    .await;

    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.progress, 100);
    assert_eq!(done.result_file.as_deref(), Some("result/j1.pdf"));
    assert!(done.error_message.is_none());
    assert!(done.started_at.is_some());
    assert!(done.completed_at.is_some());

    // The reference is fully settled.
    assert_eq!(queue.size().await.unwrap(), 0);
    assert_eq!(queue.in_flight_len().await, 0);
}

// ---------------------------------------------------------------------------
// Test: dispatcher failure lands the job in FAILED with its message
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn dispatcher_failure_lands_in_failed() {
    init_tracing();
    let store = Arc::new(InMemoryJobStore::new());
    let queue = Arc::new(InMemoryJobQueue::new());

    submit(store.as_ref(), queue.as_ref(), merge_job("j1")).await;

    let done = run_worker_until_terminal(
        store.clone(),
        queue.clone(),
        Arc::new(StubProcessor::failing("bad password")),
        "j1",
    )
    .await;

    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.error_message.as_deref(), Some("bad password"));
    assert!(done.result_file.is_none());
    assert_eq!(queue.in_flight_len().await, 0);
}

// ---------------------------------------------------------------------------
// Test: a watch sees PROCESSING before the COMPLETED terminal event
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn watch_sees_processing_then_completed() {
    init_tracing();
    let store = Arc::new(InMemoryJobStore::new());
    let queue = Arc::new(InMemoryJobQueue::new());

    let config = PipelineConfig {
        notifier_poll_interval: Duration::from_millis(100),
        ..PipelineConfig::default()
    };
    let notifier = ProgressNotifier::new(store.clone(), &config);

    submit(store.as_ref(), queue.as_ref(), merge_job("j1")).await;
    let mut rx = notifier.watch("j1").await;

    // The dispatcher holds the job in PROCESSING across several polls.
    let done = run_worker_until_terminal(
        store.clone(),
        queue.clone(),
        Arc::new(StubProcessor::slow("result/j1.pdf", Duration::from_secs(1))),
        "j1",
    )
    .await;
    assert_eq!(done.status, JobStatus::Completed);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(
        events.iter().any(|event| matches!(
            event,
            ProgressEvent::Status {
                status: JobStatus::Processing,
                ..
            }
        )),
        "expected at least one PROCESSING status event, got {events:?}",
    );
    assert_matches!(
        events.last(),
        Some(ProgressEvent::Terminal {
            status: JobStatus::Completed,
            ..
        })
    );
}

// ---------------------------------------------------------------------------
// Test: cancelling a PENDING job is terminal and blocks start()
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancelled_pending_job_rejects_start() {
    init_tracing();
    let store = Arc::new(InMemoryJobStore::new());

    let mut job = merge_job("j1");
    store.save(job.clone()).await.unwrap();

    job.cancel().unwrap();
    store.save(job.clone()).await.unwrap();

    let mut stored = store.find_by_id("j1").await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Cancelled);
    assert_matches!(stored.start(), Err(CoreError::IllegalTransition { .. }));
}

// ---------------------------------------------------------------------------
// Test: a worker pool drains several jobs and shuts down cleanly
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn worker_pool_drains_queue_and_shuts_down() {
    init_tracing();
    let store = Arc::new(InMemoryJobStore::new());
    let queue = Arc::new(InMemoryJobQueue::new());

    for id in ["j1", "j2", "j3", "j4"] {
        submit(store.as_ref(), queue.as_ref(), merge_job(id)).await;
    }

    let config = PipelineConfig {
        worker_pool_size: 2,
        queue_poll_interval: Duration::from_millis(50),
        ..PipelineConfig::default()
    };
    let pool = WorkerPool::spawn(
        &config,
        store.clone(),
        queue.clone(),
        Arc::new(StubProcessor::ok("out.pdf")),
    );
    assert_eq!(pool.len(), 2);

    // Wait until every job is terminal.
    'wait: loop {
        for id in ["j1", "j2", "j3", "j4"] {
            match store.find_by_id(id).await.unwrap() {
                Some(job) if job.status.is_terminal() => {}
                _ => {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue 'wait;
                }
            }
        }
        break;
    }

    pool.shutdown().await;

    for id in ["j1", "j2", "j3", "j4"] {
        let job = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }
    assert_eq!(queue.in_flight_len().await, 0);
}
