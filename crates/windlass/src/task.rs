//! Dispatchable units of work and their clock bounds.
//!
//! Tasks are detached from the process object that caused them: a worker
//! holds only the task's data and a single-use [`TaskToken`] proving its
//! right to commit the outcome. Redelivery, crash recovery, and the timeout
//! state machine all hinge on that token being consumed exactly once.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::event::History;
use crate::process::ProcessId;

/// Single-use credential proving the right to complete a dispatched task.
///
/// Issued by the backend when a task is dispatched and invalidated by the
/// first completion, failure, cancellation, or timeout. Every later call
/// carrying the token is rejected as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskToken(Uuid);

impl TaskToken {
    /// Issue a fresh token.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Borrow the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TaskToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

/// Clock bounds for one activity dispatch.
///
/// Registered per activity type as defaults and overridable per
/// [`Decision::ScheduleActivity`](crate::Decision::ScheduleActivity).
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use windlass::ActivityOptions;
///
/// let options = ActivityOptions::default()
///     .with_execution_timeout(Duration::from_secs(30))
///     .with_heartbeat_timeout(Duration::from_secs(5));
/// assert_eq!(options.heartbeat_timeout, Some(Duration::from_secs(5)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityOptions {
    /// Maximum queue wait before a worker picks the task up.
    pub scheduled_timeout: Duration,
    /// Maximum execution duration once dispatched.
    pub execution_timeout: Duration,
    /// Maximum gap between heartbeats once dispatched, if heartbeating is
    /// required. `None` disables the heartbeat clock.
    pub heartbeat_timeout: Option<Duration>,
}

impl Default for ActivityOptions {
    fn default() -> Self {
        Self {
            scheduled_timeout: Duration::from_secs(300),
            execution_timeout: Duration::from_secs(300),
            heartbeat_timeout: None,
        }
    }
}

impl ActivityOptions {
    /// Set the maximum queue wait.
    pub fn with_scheduled_timeout(mut self, timeout: Duration) -> Self {
        self.scheduled_timeout = timeout;
        self
    }

    /// Set the maximum execution duration.
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    /// Require heartbeats at most this far apart.
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = Some(timeout);
        self
    }
}

/// An activity execution handed to a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityTask {
    /// Completion credential for this dispatch.
    pub token: TaskToken,
    /// Registered activity type to execute.
    pub activity_type: String,
    /// Resolved input for this execution.
    pub input: Value,
    /// The clock bounds this dispatch runs under.
    pub options: ActivityOptions,
}

/// A decision point handed to a worker.
///
/// Carries a snapshot of the process history up to and including the latest
/// commit; the manager replays it into a process before invoking decision
/// logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTask {
    /// Completion credential for this dispatch.
    pub token: TaskToken,
    /// The process this decision point belongs to.
    pub process_id: ProcessId,
    /// History snapshot to replay.
    pub history: History,
}
