//! In-process backend, primarily for tests and examples.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::Backend;
use crate::activity::{ActivityResult, HeartbeatStatus};
use crate::decision::Decision;
use crate::error::{Error, Result};
use crate::event::{EventKind, TimeoutKind};
use crate::process::{Process, ProcessId, ProcessStatus, Signal};
use crate::task::{ActivityOptions, ActivityTask, DecisionTask, TaskToken};

/// Configuration for [`MemoryBackend`].
#[derive(Debug, Clone)]
pub struct MemoryBackendConfig {
    /// How long a dispatched decision task may run before it is abandoned
    /// and a fresh one is enqueued. Default: 60 seconds.
    pub decision_timeout: Duration,

    /// Timeout bounds applied to `ScheduleActivity` decisions that carry no
    /// explicit options (e.g. when the backend is driven without a manager).
    pub default_activity_options: ActivityOptions,
}

impl Default for MemoryBackendConfig {
    fn default() -> Self {
        Self {
            decision_timeout: Duration::from_secs(60),
            default_activity_options: ActivityOptions::default(),
        }
    }
}

/// An activity waiting in its type's queue for a worker.
struct ScheduledActivity {
    process_id: ProcessId,
    activity_type: String,
    input: Value,
    options: ActivityOptions,
    /// Schedule-to-start bound.
    expires_at: OffsetDateTime,
}

/// An activity dispatched to a worker, keyed by its token.
struct RunningActivity {
    process_id: ProcessId,
    activity_type: String,
    /// Start-to-close bound.
    execution_expires_at: OffsetDateTime,
    /// Heartbeat bound, reset on every heartbeat.
    heartbeat_expires_at: Option<OffsetDateTime>,
    heartbeat_timeout: Option<Duration>,
    cancel_requested: bool,
}

/// A decision point dispatched to a worker, keyed by its token.
struct RunningDecision {
    process_id: ProcessId,
    expires_at: OffsetDateTime,
}

#[derive(Default)]
struct MemoryState {
    processes: HashMap<ProcessId, Process>,
    /// One FIFO queue per activity type.
    scheduled_activities: HashMap<String, VecDeque<ScheduledActivity>>,
    running_activities: HashMap<TaskToken, RunningActivity>,
    /// Process ids with a pending decision point, at most one entry each.
    scheduled_decisions: VecDeque<ProcessId>,
    running_decisions: HashMap<TaskToken, RunningDecision>,
}

impl MemoryState {
    /// Apply every timeout whose clock has run out.
    ///
    /// Called at the top of every operation; the backend has no background
    /// clock thread, so timeouts become visible on the next call.
    fn sweep(&mut self, now: OffsetDateTime) {
        // Queued activities past their schedule-to-start bound.
        let mut timed_out = Vec::new();
        for queue in self.scheduled_activities.values_mut() {
            let mut keep = VecDeque::with_capacity(queue.len());
            for entry in queue.drain(..) {
                if entry.expires_at <= now {
                    timed_out.push(entry);
                } else {
                    keep.push_back(entry);
                }
            }
            *queue = keep;
        }
        for entry in timed_out {
            self.record_event(
                &entry.process_id,
                EventKind::ActivityTimedOut {
                    activity_type: entry.activity_type,
                    timeout: TimeoutKind::ScheduleToStart,
                },
            );
            self.schedule_decision(&entry.process_id);
        }

        // Dispatched activities past their execution or heartbeat bound.
        let mut expired = Vec::new();
        for (token, running) in &self.running_activities {
            if running.execution_expires_at <= now {
                expired.push((*token, TimeoutKind::StartToClose));
            } else if running.heartbeat_expires_at.is_some_and(|at| at <= now) {
                expired.push((*token, TimeoutKind::Heartbeat));
            }
        }
        for (token, timeout) in expired {
            if let Some(running) = self.running_activities.remove(&token) {
                self.record_event(
                    &running.process_id,
                    EventKind::ActivityTimedOut {
                        activity_type: running.activity_type,
                        timeout,
                    },
                );
                self.schedule_decision(&running.process_id);
            }
        }

        // Dispatched decision tasks past the decision timeout: invalidate
        // the token and re-enqueue a fresh decision point.
        let stale: Vec<TaskToken> = self
            .running_decisions
            .iter()
            .filter(|(_, running)| running.expires_at <= now)
            .map(|(token, _)| *token)
            .collect();
        for token in stale {
            if let Some(running) = self.running_decisions.remove(&token) {
                self.schedule_decision(&running.process_id);
            }
        }
    }

    /// Append an event to a process that is still running.
    ///
    /// Events aimed at a closed or vanished process are dropped; terminal
    /// histories are immutable.
    fn record_event(&mut self, process_id: &ProcessId, kind: EventKind) {
        if let Some(process) = self.processes.get_mut(process_id) {
            if !process.is_closed() {
                process.history.append(kind);
            }
        }
    }

    /// Enqueue a decision point for a process, deduplicating pending entries.
    fn schedule_decision(&mut self, process_id: &ProcessId) {
        let runnable = self
            .processes
            .get(process_id)
            .is_some_and(|process| !process.is_closed());
        if runnable && !self.scheduled_decisions.contains(process_id) {
            self.scheduled_decisions.push_back(process_id.clone());
        }
    }

    /// Apply a terminal decision: append the terminal event, settle the
    /// status, drop the process's pending work, and ask in-flight activities
    /// to cancel cooperatively.
    fn close_process(&mut self, process_id: &ProcessId, event: EventKind, status: ProcessStatus) {
        let Some(process) = self.processes.get_mut(process_id) else {
            return;
        };
        if process.is_closed() {
            return;
        }
        process.history.append(event);
        process.status = status;

        for queue in self.scheduled_activities.values_mut() {
            queue.retain(|entry| &entry.process_id != process_id);
        }
        self.scheduled_decisions.retain(|id| id != process_id);
        for running in self.running_activities.values_mut() {
            if &running.process_id == process_id {
                running.cancel_requested = true;
            }
        }
    }
}

/// In-memory [`Backend`] holding all state behind one lock.
///
/// All seven operations take the lock for their full duration, which makes
/// each commit atomic and serializes state transitions across however many
/// workers share the backend. Clones share the same state.
///
/// Timeouts are evaluated lazily: every operation first sweeps the clocks,
/// so an expired task transitions on the next poll, heartbeat, or commit
/// touching the backend.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryState>>,
    config: MemoryBackendConfig,
}

impl MemoryBackend {
    /// Create a backend with the given configuration.
    pub fn new(config: MemoryBackendConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryState::default())),
            config,
        }
    }

    /// Fetch a snapshot of one process, if it exists.
    ///
    /// Query surface for tests and monitoring; not part of the [`Backend`]
    /// contract.
    pub async fn process(&self, process_id: &ProcessId) -> Option<Process> {
        let state = self.inner.lock().await;
        state.processes.get(process_id).cloned()
    }

    /// Fetch snapshots of every known process.
    pub async fn processes(&self) -> Vec<Process> {
        let state = self.inner.lock().await;
        state.processes.values().cloned().collect()
    }
}

impl Backend for MemoryBackend {
    async fn start_process(&self, workflow_type: &str, input: Value) -> Result<ProcessId> {
        let mut state = self.inner.lock().await;
        state.sweep(OffsetDateTime::now_utc());

        let process_id = ProcessId::new(Uuid::new_v4().to_string());
        let process = Process::start(process_id.clone(), workflow_type, input);
        state.processes.insert(process_id.clone(), process);
        state.schedule_decision(&process_id);

        Ok(process_id)
    }

    async fn signal_process(&self, process_id: &ProcessId, signal: Signal) -> Result<()> {
        let mut state = self.inner.lock().await;
        state.sweep(OffsetDateTime::now_utc());

        let Some(process) = state.processes.get_mut(process_id) else {
            return Err(Error::UnknownProcess(process_id.clone()));
        };
        if process.is_closed() {
            return Err(Error::ProcessClosed(process_id.clone()));
        }
        process.history.append(EventKind::SignalReceived {
            name: signal.name,
            payload: signal.payload,
        });
        state.schedule_decision(process_id);

        Ok(())
    }

    async fn poll_decision_task(&self) -> Result<Option<DecisionTask>> {
        let mut state = self.inner.lock().await;
        let now = OffsetDateTime::now_utc();
        state.sweep(now);

        // Never hand out a second decision task for a process that already
        // has one in flight: commits for a process must stay serialized.
        let busy: HashSet<ProcessId> = state
            .running_decisions
            .values()
            .map(|running| running.process_id.clone())
            .collect();

        loop {
            let Some(position) = state
                .scheduled_decisions
                .iter()
                .position(|id| !busy.contains(id))
            else {
                return Ok(None);
            };
            let Some(process_id) = state.scheduled_decisions.remove(position) else {
                return Ok(None);
            };
            let Some(history) = state
                .processes
                .get(&process_id)
                .filter(|process| !process.is_closed())
                .map(|process| process.history.clone())
            else {
                continue;
            };

            let token = TaskToken::new();
            state.running_decisions.insert(
                token,
                RunningDecision {
                    process_id: process_id.clone(),
                    expires_at: now + self.config.decision_timeout,
                },
            );
            return Ok(Some(DecisionTask {
                token,
                process_id,
                history,
            }));
        }
    }

    async fn poll_activity_task(&self, activity_type: &str) -> Result<Option<ActivityTask>> {
        let mut state = self.inner.lock().await;
        let now = OffsetDateTime::now_utc();
        state.sweep(now);

        let entry = loop {
            let Some(entry) = state
                .scheduled_activities
                .get_mut(activity_type)
                .and_then(|queue| queue.pop_front())
            else {
                return Ok(None);
            };
            let runnable = state
                .processes
                .get(&entry.process_id)
                .is_some_and(|process| !process.is_closed());
            if runnable {
                break entry;
            }
        };

        let token = TaskToken::new();
        state.running_activities.insert(
            token,
            RunningActivity {
                process_id: entry.process_id.clone(),
                activity_type: entry.activity_type.clone(),
                execution_expires_at: now + entry.options.execution_timeout,
                heartbeat_expires_at: entry.options.heartbeat_timeout.map(|timeout| now + timeout),
                heartbeat_timeout: entry.options.heartbeat_timeout,
                cancel_requested: false,
            },
        );
        state.record_event(
            &entry.process_id,
            EventKind::ActivityStarted {
                activity_type: entry.activity_type.clone(),
            },
        );

        Ok(Some(ActivityTask {
            token,
            activity_type: entry.activity_type,
            input: entry.input,
            options: entry.options,
        }))
    }

    async fn record_heartbeat(&self, token: &TaskToken) -> Result<HeartbeatStatus> {
        let mut state = self.inner.lock().await;
        let now = OffsetDateTime::now_utc();
        state.sweep(now);

        let Some(running) = state.running_activities.get_mut(token) else {
            return Err(Error::StaleTaskToken(*token));
        };
        if let Some(timeout) = running.heartbeat_timeout {
            running.heartbeat_expires_at = Some(now + timeout);
        }
        Ok(if running.cancel_requested {
            HeartbeatStatus::CancelRequested
        } else {
            HeartbeatStatus::Continue
        })
    }

    async fn complete_activity_task(&self, token: &TaskToken, result: ActivityResult) -> Result<()> {
        let mut state = self.inner.lock().await;
        state.sweep(OffsetDateTime::now_utc());

        let Some(running) = state.running_activities.remove(token) else {
            return Err(Error::StaleTaskToken(*token));
        };
        let closed = state
            .processes
            .get(&running.process_id)
            .is_none_or(|process| process.is_closed());
        if closed {
            // Late result for a settled process: consume the token, drop
            // the result.
            return Ok(());
        }

        let kind = match result {
            ActivityResult::Success { value } => EventKind::ActivityCompleted {
                activity_type: running.activity_type,
                result: value,
            },
            ActivityResult::Canceled { reason } => EventKind::ActivityCanceled {
                activity_type: running.activity_type,
                reason,
            },
            ActivityResult::Failed { error } => EventKind::ActivityFailed {
                activity_type: running.activity_type,
                error,
            },
        };
        state.record_event(&running.process_id, kind);
        state.schedule_decision(&running.process_id);

        Ok(())
    }

    async fn complete_decision_task(
        &self,
        token: &TaskToken,
        decisions: Vec<Decision>,
    ) -> Result<()> {
        let mut state = self.inner.lock().await;
        let now = OffsetDateTime::now_utc();
        state.sweep(now);

        let Some(running) = state.running_decisions.remove(token) else {
            return Err(Error::StaleTaskToken(*token));
        };
        let process_id = running.process_id;

        let Some(process) = state.processes.get(&process_id) else {
            return Ok(());
        };
        if process.is_closed() {
            return Ok(());
        }
        let process_input = process.input.clone();

        if !decisions.is_empty() {
            state.record_event(
                &process_id,
                EventKind::DecisionsRecorded {
                    decisions: decisions.clone(),
                },
            );
        }

        for decision in decisions {
            match decision {
                Decision::ScheduleActivity {
                    activity_type,
                    input,
                    options,
                } => {
                    let input = input.unwrap_or_else(|| process_input.clone());
                    let options =
                        options.unwrap_or_else(|| self.config.default_activity_options.clone());
                    state.record_event(
                        &process_id,
                        EventKind::ActivityScheduled {
                            activity_type: activity_type.clone(),
                            input: input.clone(),
                        },
                    );
                    let expires_at = now + options.scheduled_timeout;
                    state
                        .scheduled_activities
                        .entry(activity_type.clone())
                        .or_default()
                        .push_back(ScheduledActivity {
                            process_id: process_id.clone(),
                            activity_type,
                            input,
                            options,
                            expires_at,
                        });
                }
                Decision::CompleteProcess { result } => {
                    state.close_process(
                        &process_id,
                        EventKind::ProcessCompleted {
                            result: result.clone(),
                        },
                        ProcessStatus::Completed { result },
                    );
                    // Decisions after a terminal decision are not processed.
                    break;
                }
                Decision::FailProcess { reason } => {
                    state.close_process(
                        &process_id,
                        EventKind::ProcessFailed {
                            reason: reason.clone(),
                        },
                        ProcessStatus::Failed { reason },
                    );
                    break;
                }
                Decision::CancelProcess { reason } => {
                    state.close_process(
                        &process_id,
                        EventKind::ProcessCanceled {
                            reason: reason.clone(),
                        },
                        ProcessStatus::Canceled { reason },
                    );
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn start_process_records_started_and_schedules_decision() {
        let backend = MemoryBackend::default();
        let process_id = backend.start_process("foo", json!([5, 3])).await.unwrap();

        let process = backend.process(&process_id).await.unwrap();
        assert_eq!(process.history.len(), 1);
        assert_eq!(process.status, ProcessStatus::Running);

        let task = backend.poll_decision_task().await.unwrap().unwrap();
        assert_eq!(task.process_id, process_id);
        assert_eq!(task.history.len(), 1);
    }

    #[tokio::test]
    async fn poll_with_nothing_scheduled_returns_none() {
        let backend = MemoryBackend::default();

        assert!(backend.poll_decision_task().await.unwrap().is_none());
        assert!(
            backend
                .poll_activity_task("multiplication")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn signal_unknown_process_is_rejected() {
        let backend = MemoryBackend::default();
        let err = backend
            .signal_process(&ProcessId::new("nope"), Signal::new("approve", json!(null)))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnknownProcess(_)));
    }

    #[tokio::test]
    async fn no_second_decision_task_while_one_is_running() {
        let backend = MemoryBackend::default();
        let process_id = backend.start_process("foo", json!(null)).await.unwrap();

        let first = backend.poll_decision_task().await.unwrap().unwrap();
        // A signal enqueues a fresh decision point for the same process...
        backend
            .signal_process(&process_id, Signal::new("poke", json!(null)))
            .await
            .unwrap();
        // ...but it must not dispatch while the first task is outstanding.
        assert!(backend.poll_decision_task().await.unwrap().is_none());

        backend
            .complete_decision_task(&first.token, vec![])
            .await
            .unwrap();
        let second = backend.poll_decision_task().await.unwrap().unwrap();
        assert_eq!(second.process_id, process_id);
        assert_ne!(second.token, first.token);
    }
}
