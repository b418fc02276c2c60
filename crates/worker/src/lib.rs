//! Worker side of the docpress job pipeline.
//!
//! A [`runner::WorkerLoop`] consumes job references from the queue, drives
//! each job through its state machine, and hands the actual document work
//! to an external [`processor::Processor`]. [`pool::WorkerPool`] spawns a
//! configured number of loops against one shared queue.

pub mod pool;
pub mod processor;
pub mod runner;

pub use pool::WorkerPool;
pub use processor::{Processor, ProcessorError};
pub use runner::WorkerLoop;
