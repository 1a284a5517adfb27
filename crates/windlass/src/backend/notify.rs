//! Pass-through backend decorator that reports state transitions.

use std::sync::Arc;

use serde_json::Value;

use super::Backend;
use crate::activity::{ActivityResult, HeartbeatStatus};
use crate::decision::Decision;
use crate::error::Result;
use crate::process::{ProcessId, Signal};
use crate::task::{ActivityTask, DecisionTask, TaskToken};

/// A state transition observed at the backend interface.
///
/// One notification per successful mutating operation. Transitions a
/// backend performs inside its own timeout sweeps are not visible at this
/// layer; listeners that need those must read histories.
#[derive(Debug, Clone)]
pub enum BackendNotification {
    /// A process was started.
    ProcessStarted {
        process_id: ProcessId,
        workflow_type: String,
        input: Value,
    },
    /// A signal was delivered.
    SignalReceived {
        process_id: ProcessId,
        signal: Signal,
    },
    /// A decision task was dispatched to a worker.
    DecisionTaskDispatched {
        token: TaskToken,
        process_id: ProcessId,
    },
    /// An activity task was dispatched to a worker.
    ActivityTaskDispatched {
        token: TaskToken,
        activity_type: String,
    },
    /// A heartbeat was recorded.
    HeartbeatRecorded {
        token: TaskToken,
        status: HeartbeatStatus,
    },
    /// An activity task committed its outcome.
    ActivityTaskCompleted {
        token: TaskToken,
        result: ActivityResult,
    },
    /// A decision task committed its decisions.
    DecisionTaskCompleted {
        token: TaskToken,
        decisions: Vec<Decision>,
    },
}

/// Callback invoked with every [`BackendNotification`].
pub type BackendListener = Arc<dyn Fn(&BackendNotification) + Send + Sync>;

/// Decorator over any [`Backend`] that notifies injected listeners.
///
/// Listeners are injected at construction; there is no global registration.
/// The decorated backend's return values and errors pass through untouched,
/// and listeners run only after the underlying operation succeeded.
///
/// # Example
///
/// ```ignore
/// let backend = NotifyingBackend::new(MemoryBackend::default())
///     .with_listener(Arc::new(|notification| {
///         tracing::info!(?notification, "backend transition");
///     }));
/// ```
#[derive(Clone)]
pub struct NotifyingBackend<B> {
    inner: B,
    listeners: Vec<BackendListener>,
}

impl<B> NotifyingBackend<B> {
    /// Wrap a backend with no listeners yet.
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            listeners: Vec::new(),
        }
    }

    /// Add a listener.
    pub fn with_listener(mut self, listener: BackendListener) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Borrow the decorated backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn emit(&self, notification: BackendNotification) {
        for listener in &self.listeners {
            listener(&notification);
        }
    }
}

impl<B: Backend> Backend for NotifyingBackend<B> {
    async fn start_process(&self, workflow_type: &str, input: Value) -> Result<ProcessId> {
        let process_id = self.inner.start_process(workflow_type, input.clone()).await?;
        self.emit(BackendNotification::ProcessStarted {
            process_id: process_id.clone(),
            workflow_type: workflow_type.to_owned(),
            input,
        });
        Ok(process_id)
    }

    async fn signal_process(&self, process_id: &ProcessId, signal: Signal) -> Result<()> {
        self.inner.signal_process(process_id, signal.clone()).await?;
        self.emit(BackendNotification::SignalReceived {
            process_id: process_id.clone(),
            signal,
        });
        Ok(())
    }

    async fn poll_decision_task(&self) -> Result<Option<DecisionTask>> {
        let task = self.inner.poll_decision_task().await?;
        if let Some(task) = &task {
            self.emit(BackendNotification::DecisionTaskDispatched {
                token: task.token,
                process_id: task.process_id.clone(),
            });
        }
        Ok(task)
    }

    async fn poll_activity_task(&self, activity_type: &str) -> Result<Option<ActivityTask>> {
        let task = self.inner.poll_activity_task(activity_type).await?;
        if let Some(task) = &task {
            self.emit(BackendNotification::ActivityTaskDispatched {
                token: task.token,
                activity_type: task.activity_type.clone(),
            });
        }
        Ok(task)
    }

    async fn record_heartbeat(&self, token: &TaskToken) -> Result<HeartbeatStatus> {
        let status = self.inner.record_heartbeat(token).await?;
        self.emit(BackendNotification::HeartbeatRecorded {
            token: *token,
            status,
        });
        Ok(status)
    }

    async fn complete_activity_task(&self, token: &TaskToken, result: ActivityResult) -> Result<()> {
        self.inner
            .complete_activity_task(token, result.clone())
            .await?;
        self.emit(BackendNotification::ActivityTaskCompleted {
            token: *token,
            result,
        });
        Ok(())
    }

    async fn complete_decision_task(
        &self,
        token: &TaskToken,
        decisions: Vec<Decision>,
    ) -> Result<()> {
        self.inner
            .complete_decision_task(token, decisions.clone())
            .await?;
        self.emit(BackendNotification::DecisionTaskCompleted {
            token: *token,
            decisions,
        });
        Ok(())
    }
}
