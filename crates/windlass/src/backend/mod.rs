//! Backend abstraction for process state and task dispatch.
//!
//! A backend owns the canonical state: process histories, task queues, and
//! the timeout state machine. Everything else in the crate goes through the
//! seven operations of the [`Backend`] trait and never assumes anything
//! about how tasks are transported or persisted.
//!
//! Two implementations are provided:
//!
//! - [`MemoryBackend`] — in-process reference backend, primarily for tests
//! - [`NotifyingBackend`] — pass-through decorator that reports state
//!   transitions to injected listeners

mod memory;
mod notify;

use std::future::Future;

use serde_json::Value;

pub use memory::{MemoryBackend, MemoryBackendConfig};
pub use notify::{BackendListener, BackendNotification, NotifyingBackend};

use crate::activity::{ActivityResult, HeartbeatStatus};
use crate::decision::Decision;
use crate::error::Result;
use crate::process::{ProcessId, Signal};
use crate::task::{ActivityTask, DecisionTask, TaskToken};

/// The operations every backend must expose — and the only ones the core
/// ever calls.
///
/// # Guarantees the core relies on
///
/// - **Single dispatch per token**: at most one worker holds a given task's
///   token; no two polls return the same dispatch.
/// - **Atomic commits**: appending the events of a completed task and
///   enqueuing its follow-on tasks happen atomically from the caller's
///   perspective.
/// - **Prompt polls**: a poll with no available task returns `None` (or
///   blocks with a bound) rather than hanging; pacing is the worker's job.
/// - **Stale tokens are inert**: any call carrying a consumed or unknown
///   token fails with [`Error::StaleTaskToken`](crate::Error::StaleTaskToken)
///   and changes nothing.
/// - **Terminal processes are settled**: completing a task whose process
///   already reached a terminal status consumes the token and silently
///   succeeds, so late results from canceled work are dropped rather than
///   recorded.
pub trait Backend: Send + Sync + Clone + 'static {
    /// Start a process of the given workflow type, recording
    /// `ProcessStarted` and enqueuing its first decision task.
    fn start_process(
        &self,
        workflow_type: &str,
        input: Value,
    ) -> impl Future<Output = Result<ProcessId>> + Send;

    /// Deliver a signal to a running process, recording `SignalReceived`
    /// and enqueuing a decision task.
    fn signal_process(
        &self,
        process_id: &ProcessId,
        signal: Signal,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Dispatch the next available decision task, if any.
    ///
    /// No two decision tasks for the same process are ever outstanding
    /// simultaneously.
    fn poll_decision_task(&self) -> impl Future<Output = Result<Option<DecisionTask>>> + Send;

    /// Dispatch the next available activity task of the given type, if any.
    fn poll_activity_task(
        &self,
        activity_type: &str,
    ) -> impl Future<Output = Result<Option<ActivityTask>>> + Send;

    /// Record a heartbeat for a running activity task, resetting its
    /// heartbeat clock.
    ///
    /// The answer doubles as the cancellation channel: once the backend has
    /// marked the task canceled, the status is
    /// [`HeartbeatStatus::CancelRequested`].
    fn record_heartbeat(
        &self,
        token: &TaskToken,
    ) -> impl Future<Output = Result<HeartbeatStatus>> + Send;

    /// Commit the outcome of an activity task: append the matching event
    /// and enqueue a fresh decision task.
    fn complete_activity_task(
        &self,
        token: &TaskToken,
        result: ActivityResult,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Commit the decisions of a decision task: append events, enqueue
    /// activity tasks, and apply terminal decisions, atomically.
    fn complete_decision_task(
        &self,
        token: &TaskToken,
        decisions: Vec<Decision>,
    ) -> impl Future<Output = Result<()>> + Send;
}
