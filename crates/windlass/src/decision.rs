//! Decisions: the instructions decision logic hands back to the backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::task::ActivityOptions;

/// An instruction produced by decision logic.
///
/// Decisions are data: the manager resolves shorthands against the registry
/// and the backend turns the resolved list into events and task queue
/// entries in one atomic commit.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use windlass::Decision;
///
/// // Bare reference: run the activity with the process's own input and the
/// // registered timeout defaults.
/// let schedule = Decision::schedule("multiplication");
///
/// // Explicit input.
/// let schedule = Decision::schedule("multiplication").with_input(json!([5, 3]));
///
/// let done = Decision::complete(json!(15));
/// let failed = Decision::fail("no result after three attempts");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Decision {
    /// Schedule an activity task.
    ///
    /// `input: None` is the bare-reference shorthand for "the process's own
    /// input"; `options: None` means "the registered defaults for this
    /// activity type". Both are resolved before the commit reaches the
    /// backend's queues.
    ScheduleActivity {
        activity_type: String,
        input: Option<Value>,
        options: Option<ActivityOptions>,
    },
    /// Complete the process with a terminal result.
    CompleteProcess { result: Value },
    /// Fail the process with a terminal reason.
    FailProcess { reason: String },
    /// Cancel the process, marking outstanding work for cooperative
    /// cancellation.
    CancelProcess { reason: Option<String> },
}

impl Decision {
    /// Schedule an activity with the process's own input and the registered
    /// defaults.
    pub fn schedule(activity_type: impl Into<String>) -> Self {
        Decision::ScheduleActivity {
            activity_type: activity_type.into(),
            input: None,
            options: None,
        }
    }

    /// Complete the process with `result`.
    pub fn complete(result: Value) -> Self {
        Decision::CompleteProcess { result }
    }

    /// Fail the process with `reason`.
    pub fn fail(reason: impl Into<String>) -> Self {
        Decision::FailProcess {
            reason: reason.into(),
        }
    }

    /// Cancel the process without a reason.
    pub fn cancel() -> Self {
        Decision::CancelProcess { reason: None }
    }

    /// Cancel the process with a reason.
    pub fn cancel_with(reason: impl Into<String>) -> Self {
        Decision::CancelProcess {
            reason: Some(reason.into()),
        }
    }

    /// Set an explicit input on a `ScheduleActivity` decision.
    ///
    /// Has no effect on other variants.
    pub fn with_input(mut self, value: Value) -> Self {
        if let Decision::ScheduleActivity { input, .. } = &mut self {
            *input = Some(value);
        }
        self
    }

    /// Set explicit timeout options on a `ScheduleActivity` decision.
    ///
    /// Has no effect on other variants.
    pub fn with_options(mut self, activity_options: ActivityOptions) -> Self {
        if let Decision::ScheduleActivity { options, .. } = &mut self {
            *options = Some(activity_options);
        }
        self
    }
}
