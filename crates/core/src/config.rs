//! Pipeline configuration loaded from environment variables.

use std::time::Duration;

/// Tunables for the worker loop and progress notifier.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How long a worker blocks on an empty queue before re-checking its
    /// shutdown flag (default: `5s`).
    pub queue_poll_interval: Duration,
    /// How often the progress notifier polls the store per watched job
    /// (default: `2s`).
    pub notifier_poll_interval: Duration,
    /// Ceiling on how long a watch may stay open without reaching a
    /// terminal state before it is force-closed (default: `300s`).
    pub notifier_idle_timeout: Duration,
    /// Number of concurrent worker loops to spawn (default: `2`).
    pub worker_pool_size: usize,
    /// Declared retry budget. No component consults this yet — the worker
    /// never re-publishes a failed job; retry means submitting a fresh one.
    #[allow(dead_code)]
    pub max_retries: u32,
}

impl PipelineConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default |
    /// |------------------------------|---------|
    /// | `QUEUE_POLL_INTERVAL_SECS`   | `5`     |
    /// | `NOTIFIER_POLL_INTERVAL_SECS`| `2`     |
    /// | `NOTIFIER_IDLE_TIMEOUT_SECS` | `300`   |
    /// | `WORKER_POOL_SIZE`           | `2`     |
    /// | `MAX_RETRIES`                | `3`     |
    pub fn from_env() -> Self {
        Self {
            queue_poll_interval: Duration::from_secs(env_u64("QUEUE_POLL_INTERVAL_SECS", 5)),
            notifier_poll_interval: Duration::from_secs(env_u64(
                "NOTIFIER_POLL_INTERVAL_SECS",
                2,
            )),
            notifier_idle_timeout: Duration::from_secs(env_u64(
                "NOTIFIER_IDLE_TIMEOUT_SECS",
                300,
            )),
            worker_pool_size: env_u64("WORKER_POOL_SIZE", 2) as usize,
            max_retries: env_u64("MAX_RETRIES", 3) as u32,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_poll_interval: Duration::from_secs(5),
            notifier_poll_interval: Duration::from_secs(2),
            notifier_idle_timeout: Duration::from_secs(300),
            worker_pool_size: 2,
            max_retries: 3,
        }
    }
}

/// Read an integer env var, falling back to `default` when unset.
fn env_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid integer, got \"{raw}\"")),
        Err(_) => default,
    }
}
