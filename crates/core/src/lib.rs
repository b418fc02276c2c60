//! Shared domain types for the docpress job pipeline.
//!
//! This crate holds the [`job::Job`] entity and its state machine, the
//! domain error taxonomy, and the environment-driven pipeline
//! configuration. It has no internal dependencies and performs no I/O.

pub mod config;
pub mod error;
pub mod job;
pub mod types;
