//! Error types for windlass.

use thiserror::Error;

use crate::process::ProcessId;
use crate::task::TaskToken;

/// A `Result` alias with [`enum@Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in windlass operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to serialize or deserialize an input, event, or result payload.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A history snapshot could not be replayed into a process.
    ///
    /// Includes which process failed and what was wrong with the history
    /// (empty, or not starting with a process-started event).
    #[error("malformed history for process {process_id}: {detail}")]
    MalformedHistory {
        /// The process whose history failed to replay.
        process_id: ProcessId,
        /// What was wrong with the history.
        detail: String,
    },

    /// Workflow type was not registered with the manager.
    #[error("unknown workflow type: {0}")]
    UnknownWorkflowType(String),

    /// Workflow type was registered more than once.
    #[error("duplicate workflow type registration: {0}")]
    DuplicateWorkflowType(String),

    /// Activity type was not registered with the manager.
    #[error("unknown activity type: {0}")]
    UnknownActivityType(String),

    /// Activity type was registered more than once.
    #[error("duplicate activity type registration: {0}")]
    DuplicateActivityType(String),

    /// The backend has no process with this id.
    #[error("unknown process: {0}")]
    UnknownProcess(ProcessId),

    /// The process has already reached a terminal status.
    #[error("process {0} is closed")]
    ProcessClosed(ProcessId),

    /// The completion token was already consumed, or never issued.
    ///
    /// Completing, failing, canceling, or heartbeating a consumed token is
    /// rejected and must leave backend state unchanged.
    #[error("stale task token: {0}")]
    StaleTaskToken(TaskToken),

    /// Decision logic produced different output when replayed on the same
    /// history. There is no safe recovery for this decision task.
    #[error("non-deterministic decisions for process {process_id}: repeated decide() calls disagree")]
    NondeterministicDecisions {
        /// The process whose decision logic diverged.
        process_id: ProcessId,
    },

    /// Backend-specific I/O failure.
    ///
    /// External backend implementations report transport and storage faults
    /// through this variant; worker loops treat it as recoverable and retry
    /// on their next poll.
    #[error("backend error: {message}")]
    Backend {
        /// Human-readable description of the fault.
        message: String,
    },
}

impl Error {
    /// Create a backend I/O error from any displayable fault.
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend {
            message: message.into(),
        }
    }
}
