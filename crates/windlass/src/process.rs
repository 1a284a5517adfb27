//! Processes: execution instances of a workflow type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::event::{EventKind, History};

/// A process instance identifier.
///
/// Assigned by the backend at [`start_process`](crate::backend::Backend::start_process);
/// opaque to everything else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessId(String);

impl ProcessId {
    /// Create a process id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl From<String> for ProcessId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProcessId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Where a process is in its lifecycle.
///
/// Transitions are one-directional: `Running` moves to exactly one of the
/// terminal variants and never back. The terminal variants carry the
/// process's externally visible outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum ProcessStatus {
    /// The process accepts decisions, signals, and activity results.
    Running,
    /// A decision completed the process with this result.
    Completed { result: Value },
    /// A decision failed the process.
    Failed { reason: String },
    /// A decision canceled the process.
    Canceled { reason: Option<String> },
}

impl ProcessStatus {
    /// Returns `true` for any status other than `Running`.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessStatus::Running)
    }
}

/// An execution instance of a workflow type.
///
/// Created by the backend on `start_process` and reconstructed by the
/// manager from a decision task's history snapshot. Decision logic reads a
/// process; only the backend mutates one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Process {
    /// Backend-assigned identity.
    pub id: ProcessId,
    /// Name of the workflow type driving this process.
    pub workflow_type: String,
    /// The input the process was started with.
    pub input: Value,
    /// Everything that has happened so far.
    pub history: History,
    /// Current lifecycle position.
    pub status: ProcessStatus,
}

impl Process {
    /// Create a fresh process whose history opens with `ProcessStarted`.
    ///
    /// Used by backends when servicing `start_process`.
    pub fn start(id: ProcessId, workflow_type: impl Into<String>, input: Value) -> Self {
        let workflow_type = workflow_type.into();
        let mut history = History::new();
        history.append(EventKind::ProcessStarted {
            workflow_type: workflow_type.clone(),
            input: input.clone(),
        });
        Self {
            id,
            workflow_type,
            input,
            history,
            status: ProcessStatus::Running,
        }
    }

    /// Reconstruct a process from a history snapshot.
    ///
    /// The first event must be `ProcessStarted`; the status is derived from
    /// the terminal event, if one is present. This is the replay entry point
    /// the manager uses before invoking decision logic: the history is the
    /// sole input, so identical snapshots reconstruct identical processes.
    pub fn replay(id: ProcessId, history: History) -> Result<Self> {
        let Some(first) = history.first() else {
            return Err(Error::MalformedHistory {
                process_id: id,
                detail: "history is empty".into(),
            });
        };
        let EventKind::ProcessStarted {
            workflow_type,
            input,
        } = &first.kind
        else {
            return Err(Error::MalformedHistory {
                process_id: id,
                detail: format!("first event is not ProcessStarted: {:?}", first.kind),
            });
        };
        let workflow_type = workflow_type.clone();
        let input = input.clone();

        let mut status = ProcessStatus::Running;
        for event in &history {
            match &event.kind {
                EventKind::ProcessCompleted { result } => {
                    status = ProcessStatus::Completed {
                        result: result.clone(),
                    };
                }
                EventKind::ProcessFailed { reason } => {
                    status = ProcessStatus::Failed {
                        reason: reason.clone(),
                    };
                }
                EventKind::ProcessCanceled { reason } => {
                    status = ProcessStatus::Canceled {
                        reason: reason.clone(),
                    };
                }
                _ => {}
            }
        }

        Ok(Self {
            id,
            workflow_type,
            input,
            history,
            status,
        })
    }

    /// Returns `true` once the process reached a terminal status.
    pub fn is_closed(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A named signal delivered to a running process.
///
/// Recorded as a `SignalReceived` event; decision logic observes it through
/// the history on its next decision task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Signal name, meaningful to the workflow.
    pub name: String,
    /// Arbitrary JSON payload.
    pub payload: Value,
}

impl Signal {
    /// Create a signal.
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn start_opens_history_with_process_started() {
        let process = Process::start(ProcessId::new("p-1"), "foo", json!([5, 3]));

        assert_eq!(process.history.len(), 1);
        assert!(matches!(
            &process.history.first().map(|e| &e.kind),
            Some(EventKind::ProcessStarted { workflow_type, .. }) if workflow_type == "foo"
        ));
        assert_eq!(process.status, ProcessStatus::Running);
    }

    #[test]
    fn replay_reconstructs_identity_and_input() {
        let original = Process::start(ProcessId::new("p-1"), "foo", json!([5, 3]));
        let replayed = Process::replay(ProcessId::new("p-1"), original.history.clone()).unwrap();

        assert_eq!(replayed.workflow_type, "foo");
        assert_eq!(replayed.input, json!([5, 3]));
        assert_eq!(replayed.status, ProcessStatus::Running);
    }

    #[test]
    fn replay_derives_terminal_status() {
        let mut process = Process::start(ProcessId::new("p-1"), "foo", json!([5, 3]));
        process
            .history
            .append(EventKind::ProcessCompleted { result: json!(15) });

        let replayed = Process::replay(ProcessId::new("p-1"), process.history).unwrap();
        assert_eq!(
            replayed.status,
            ProcessStatus::Completed { result: json!(15) }
        );
        assert!(replayed.is_closed());
    }

    #[test]
    fn replay_rejects_empty_history() {
        let err = Process::replay(ProcessId::new("p-1"), History::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedHistory { .. }));
    }

    #[test]
    fn replay_rejects_history_not_opening_with_process_started() {
        let mut history = History::new();
        history.append(EventKind::ActivityStarted {
            activity_type: "multiplication".into(),
        });

        let err = Process::replay(ProcessId::new("p-1"), history).unwrap_err();
        assert!(matches!(err, Error::MalformedHistory { .. }));
    }
}
