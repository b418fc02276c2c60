//! The worker consumption/dispatch loop.
//!
//! Consumes one job reference at a time, loads the record, transitions
//! it to `Processing`, invokes the [`Processor`], and persists the
//! terminal state. Every per-job error is caught and logged inside the
//! iteration — one bad job never kills the loop — while infrastructure
//! errors back off for one poll interval and retry indefinitely.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use docpress_store::{JobQueue, JobStore, QueuedJob, StoreError};

use crate::processor::{Processor, ProcessorError};

/// Default blocking-consume timeout, which doubles as the idle poll
/// interval and the infrastructure back-off.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// A single sequential worker loop.
///
/// Multiple instances may run concurrently against the same queue — in
/// this process via [`WorkerPool`](crate::WorkerPool) or across
/// processes — because the queue's pop is exclusive per reference.
#[derive(Clone)]
pub struct WorkerLoop {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn JobQueue>,
    processor: Arc<dyn Processor>,
    poll_interval: Duration,
    /// Identifies this loop in logs when several share a process.
    worker_id: usize,
}

impl WorkerLoop {
    /// Create a worker loop with the default 5-second poll interval.
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn JobQueue>,
        processor: Arc<dyn Processor>,
    ) -> Self {
        Self {
            store,
            queue,
            processor,
            poll_interval: DEFAULT_POLL_INTERVAL,
            worker_id: 0,
        }
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Set the log-facing worker id.
    pub fn with_worker_id(mut self, worker_id: usize) -> Self {
        self.worker_id = worker_id;
        self
    }

    /// Run until the cancellation token is triggered.
    ///
    /// Cancellation is observed at the top of each iteration; a dispatch
    /// already in progress runs to completion first.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            worker_id = self.worker_id,
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Worker loop started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(worker_id = self.worker_id, "Worker loop shutting down");
                    break;
                }
                consumed = self.queue.consume(self.poll_interval) => match consumed {
                    Ok(Some(entry)) => self.handle_entry(entry, &cancel).await,
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(
                            worker_id = self.worker_id,
                            error = %e,
                            "Queue unavailable, backing off",
                        );
                        self.pause(&cancel).await;
                    }
                }
            }
        }
    }

    /// One consumed reference, from load to acknowledge. Never returns
    /// an error; per-job failures are absorbed here.
    async fn handle_entry(&self, entry: QueuedJob, cancel: &CancellationToken) {
        tracing::info!(
            worker_id = self.worker_id,
            job_id = %entry.job_id,
            operation = %entry.operation,
            "Job consumed",
        );

        // Load the authoritative record.
        let mut job = match self.store.find_by_id(&entry.job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                // A reference without a record is settled, not fatal.
                tracing::warn!(job_id = %entry.job_id, "Job record missing, dropping reference");
                self.acknowledge(&entry).await;
                return;
            }
            Err(e) => {
                self.back_off(&entry, &e, "load", cancel).await;
                return;
            }
        };

        // Claim it. A concurrent start (or an early cancel) shows up as
        // an illegal transition; settle the reference and move on.
        if let Err(e) = job.start() {
            tracing::warn!(job_id = %job.id, error = %e, "Job not startable, dropping reference");
            self.acknowledge(&entry).await;
            return;
        }

        if let Err(e) = self.store.save(job.clone()).await {
            self.back_off(&entry, &e, "persist PROCESSING", cancel).await;
            return;
        }

        // Dispatch. May take arbitrarily long.
        let outcome = self.processor.process(&job).await;
        self.settle(&entry, outcome).await;
    }

    /// Persist the terminal state and acknowledge the reference.
    ///
    /// The record is re-loaded first: the store is the source of truth
    /// and the job may have been cancelled while the dispatcher ran, in
    /// which case the transition is rejected and logged, never raised.
    async fn settle(&self, entry: &QueuedJob, outcome: Result<String, ProcessorError>) {
        match self.store.find_by_id(&entry.job_id).await {
            Ok(Some(mut job)) => {
                let transition = match &outcome {
                    Ok(result_file) => {
                        tracing::info!(
                            job_id = %job.id,
                            result_file = %result_file,
                            "Job processed",
                        );
                        job.complete(result_file.clone())
                    }
                    Err(failure) => {
                        tracing::warn!(job_id = %job.id, error = %failure, "Job processing failed");
                        job.fail(failure.to_string())
                    }
                };

                match transition {
                    Ok(()) => {
                        if let Err(e) = self.store.save(job).await {
                            tracing::error!(
                                job_id = %entry.job_id,
                                error = %e,
                                "Failed to persist terminal state",
                            );
                        }
                    }
                    Err(e) => {
                        // Typically a cancel that landed mid-dispatch.
                        tracing::warn!(
                            job_id = %entry.job_id,
                            error = %e,
                            "Terminal transition rejected, leaving stored state as-is",
                        );
                    }
                }
            }
            Ok(None) => {
                tracing::warn!(job_id = %entry.job_id, "Job vanished before terminal transition");
            }
            Err(e) => {
                tracing::error!(
                    job_id = %entry.job_id,
                    error = %e,
                    "Store unreachable while settling job",
                );
            }
        }

        self.acknowledge(entry).await;
    }

    /// Acknowledge, logging (not raising) on queue failure.
    async fn acknowledge(&self, entry: &QueuedJob) {
        if let Err(e) = self.queue.acknowledge(entry).await {
            tracing::error!(job_id = %entry.job_id, error = %e, "Failed to acknowledge entry");
        }
    }

    /// Infrastructure failure before dispatch: log, sleep one poll
    /// interval, leave the reference un-acknowledged in the in-flight set.
    async fn back_off(
        &self,
        entry: &QueuedJob,
        error: &StoreError,
        stage: &str,
        cancel: &CancellationToken,
    ) {
        tracing::error!(
            worker_id = self.worker_id,
            job_id = %entry.job_id,
            error = %error,
            stage,
            "Store unavailable, backing off",
        );
        self.pause(cancel).await;
    }

    /// Sleep one poll interval, cut short by shutdown so a stop during
    /// a back-off is observed immediately.
    async fn pause(&self, cancel: &CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(self.poll_interval) => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
