//! Spawns and shuts down a fixed-size set of worker loops.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use docpress_core::config::PipelineConfig;
use docpress_store::{JobQueue, JobStore};

use crate::processor::Processor;
use crate::runner::WorkerLoop;

/// A set of concurrently running [`WorkerLoop`]s sharing one queue.
///
/// Scale-out needs no partitioning: the queue's pop is exclusive per
/// reference, so each loop simply consumes whatever arrives next.
pub struct WorkerPool {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `config.worker_pool_size` loops on the current runtime.
    pub fn spawn(
        config: &PipelineConfig,
        store: Arc<dyn JobStore>,
        queue: Arc<dyn JobQueue>,
        processor: Arc<dyn Processor>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let handles = (0..config.worker_pool_size.max(1))
            .map(|worker_id| {
                let worker = WorkerLoop::new(store.clone(), queue.clone(), processor.clone())
                    .with_poll_interval(config.queue_poll_interval)
                    .with_worker_id(worker_id);
                let cancel = cancel.clone();
                tokio::spawn(async move { worker.run(cancel).await })
            })
            .collect();

        tracing::info!(
            pool_size = config.worker_pool_size.max(1),
            "Worker pool started",
        );
        Self { cancel, handles }
    }

    /// Number of loops in the pool.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Signal every loop to stop and wait for them to drain.
    ///
    /// Loops observe the signal at the top of their next iteration, so a
    /// dispatch in progress finishes before its loop exits.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for handle in self.handles {
            // A panicked worker task has already been logged by the
            // runtime; shutdown still completes.
            let _ = handle.await;
        }
        tracing::info!("Worker pool stopped");
    }
}
