//! Durable-store contracts for the docpress job pipeline.
//!
//! [`job_store::JobStore`] is a key-value mapping from job id to the full
//! job record; [`job_queue::JobQueue`] is a FIFO of lightweight
//! [`job_queue::QueuedJob`] references with an in-flight tracking set.
//! Both are async traits so the backing technology stays generic; the
//! [`memory`] module provides the in-process implementations used by
//! tests and single-node deployments.

pub mod error;
pub mod job_queue;
pub mod job_store;
pub mod memory;

pub use error::{StoreError, StoreResult};
pub use job_queue::{JobQueue, QueuedJob};
pub use job_store::JobStore;
pub use memory::{InMemoryJobQueue, InMemoryJobStore};
