//! Progress streaming for watched jobs.
//!
//! [`notifier::ProgressNotifier`] opens at most one watch per job id,
//! polls the job store on a fixed interval, and pushes
//! [`event::ProgressEvent`]s down a per-job channel until the job
//! reaches a terminal state, the watch is abandoned, or the idle ceiling
//! is hit. The transport (SSE, WebSocket) frames the events elsewhere.

pub mod event;
pub mod notifier;
pub mod registry;

pub use event::ProgressEvent;
pub use notifier::ProgressNotifier;
pub use registry::SubscriptionRegistry;
