//! Worker pool configuration.

use std::time::Duration;

/// Configuration for the polling workers.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use windlass::runtime::RuntimeConfig;
///
/// let config = RuntimeConfig {
///     decision_poll_interval: Duration::from_millis(50),
///     decision_workers: 2,
///     activity_workers: 4,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// How often each decision worker polls for a decision task.
    ///
    /// Lower values reduce decision latency but increase backend load.
    /// Default: 100ms.
    pub decision_poll_interval: Duration,

    /// How often each activity worker polls for an activity task.
    ///
    /// Default: 100ms.
    pub activity_poll_interval: Duration,

    /// Number of decision workers to spawn.
    ///
    /// Correctness does not depend on the count; the backend dispatches
    /// each task to exactly one worker. Default: 1.
    pub decision_workers: usize,

    /// Number of activity workers to spawn per registered activity type.
    ///
    /// Increase this when executions are slow and the same activity type is
    /// scheduled concurrently. Default: 1.
    pub activity_workers: usize,

    /// Maximum time to wait for in-flight work during shutdown.
    ///
    /// After this timeout the pool stops waiting and returns.
    /// Default: 30 seconds.
    pub shutdown_timeout: Duration,

    /// Worker pool identifier used in worker names and logs.
    ///
    /// If `None`, a UUID is generated when the pool starts.
    pub worker_id: Option<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            decision_poll_interval: Duration::from_millis(100),
            activity_poll_interval: Duration::from_millis(100),
            decision_workers: 1,
            activity_workers: 1,
            shutdown_timeout: Duration::from_secs(30),
            worker_id: None,
        }
    }
}
