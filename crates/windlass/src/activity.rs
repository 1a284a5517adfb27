//! Activity execution contract: results, heartbeats, cooperative cancellation.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::task::TaskToken;

/// The outcome of one activity execution.
///
/// Recorded verbatim as an event in the process history. Business failures
/// and infrastructure failures both land in `Failed`; an activity that wants
/// a distinguishable "declined to run" outcome returns `Canceled` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome")]
pub enum ActivityResult {
    /// The activity produced a value.
    Success { value: Value },
    /// The activity chose not to complete, with an optional reason.
    Canceled { reason: Option<String> },
    /// The activity failed.
    Failed { error: String },
}

impl ActivityResult {
    /// A successful outcome carrying `value`.
    pub fn success(value: impl Into<Value>) -> Self {
        ActivityResult::Success {
            value: value.into(),
        }
    }

    /// A canceled outcome with a reason.
    pub fn canceled(reason: impl Into<String>) -> Self {
        ActivityResult::Canceled {
            reason: Some(reason.into()),
        }
    }

    /// A failed outcome with an error description.
    pub fn failed(error: impl Into<String>) -> Self {
        ActivityResult::Failed {
            error: error.into(),
        }
    }

    /// Returns `true` for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, ActivityResult::Success { .. })
    }
}

/// What the backend answered to a heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatStatus {
    /// Keep going.
    Continue,
    /// The backend has marked this task canceled; the activity should wind
    /// down and return [`ActivityResult::Canceled`].
    CancelRequested,
}

impl HeartbeatStatus {
    /// Returns `true` if the backend asked the activity to stop.
    pub fn is_cancel_requested(&self) -> bool {
        matches!(self, HeartbeatStatus::CancelRequested)
    }
}

/// Sink for heartbeat signals.
///
/// The manager wires this to
/// [`Backend::record_heartbeat`](crate::backend::Backend::record_heartbeat);
/// tests can substitute their own implementation to drive an activity
/// without a backend.
#[async_trait]
pub trait Heartbeater: Send + Sync {
    /// Record one heartbeat for the given task token.
    async fn record(&self, token: &TaskToken) -> Result<HeartbeatStatus>;
}

/// Execution context handed to an activity, fresh per dispatched task.
///
/// The [`heartbeat`](Self::heartbeat) call is both the liveness signal that
/// resets the task's heartbeat clock and the cancellation checkpoint: a
/// process-level cancel is only observable to an in-flight activity through
/// its answer.
pub struct ActivityContext {
    token: TaskToken,
    activity_type: String,
    heartbeater: Arc<dyn Heartbeater>,
}

impl ActivityContext {
    /// Create a context for one dispatched task.
    pub fn new(
        token: TaskToken,
        activity_type: impl Into<String>,
        heartbeater: Arc<dyn Heartbeater>,
    ) -> Self {
        Self {
            token,
            activity_type: activity_type.into(),
            heartbeater,
        }
    }

    /// The completion token of this dispatch.
    pub fn token(&self) -> &TaskToken {
        &self.token
    }

    /// The activity type being executed.
    pub fn activity_type(&self) -> &str {
        &self.activity_type
    }

    /// Signal liveness and pick up a pending cancellation request.
    ///
    /// Long-running work should call this periodically; the call is bounded
    /// by the backend's own I/O and must not be used as a progress barrier.
    pub async fn heartbeat(&self) -> Result<HeartbeatStatus> {
        self.heartbeater.record(&self.token).await
    }
}

/// Execution logic for one activity type.
///
/// An implementation is registered once per activity type and invoked with a
/// fresh [`ActivityContext`] per dispatched task; it must keep no mutable
/// state across executions.
///
/// # Outcomes
///
/// | Return | Recorded as |
/// |--------|-------------|
/// | `Ok(ActivityResult::Success { .. })` | `ActivityCompleted` |
/// | `Ok(ActivityResult::Canceled { .. })` | `ActivityCanceled` |
/// | `Ok(ActivityResult::Failed { .. })` | `ActivityFailed` |
/// | `Err(_)` | `ActivityFailed`, with the error's display form |
///
/// Propagating an error with `?` and returning `Failed` explicitly are
/// equivalent at the history level; use whichever reads better.
///
/// # Example
///
/// ```ignore
/// struct MultiplicationActivity;
///
/// #[async_trait]
/// impl Activity for MultiplicationActivity {
///     type Error = anyhow::Error;
///
///     async fn execute(
///         &self,
///         input: Value,
///         ctx: &ActivityContext,
///     ) -> Result<ActivityResult, Self::Error> {
///         let operands: Vec<i64> = serde_json::from_value(input)?;
///         let mut acc = 0;
///         for _ in 0..operands[0] {
///             if ctx.heartbeat().await?.is_cancel_requested() {
///                 return Ok(ActivityResult::canceled("cancel requested"));
///             }
///             acc += operands[1];
///         }
///         Ok(ActivityResult::success(acc))
///     }
/// }
/// ```
#[async_trait]
pub trait Activity: Send + Sync + 'static {
    /// The error type propagated out of `execute`.
    ///
    /// Must implement `Display`; the manager records the display form as the
    /// failure error. Common choices: `anyhow::Error` or a custom error type.
    type Error: std::fmt::Display + Send + 'static;

    /// Execute the activity against a resolved input.
    async fn execute(
        &self,
        input: Value,
        ctx: &ActivityContext,
    ) -> std::result::Result<ActivityResult, Self::Error>;
}
