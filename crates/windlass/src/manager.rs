//! The manager: binds a backend to registries of workflow and activity types.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::activity::{Activity, ActivityContext, ActivityResult, HeartbeatStatus, Heartbeater};
use crate::backend::Backend;
use crate::decision::Decision;
use crate::error::{Error, Result};
use crate::process::{Process, ProcessId, Signal};
use crate::task::{ActivityOptions, TaskToken};
use crate::workflow::Workflow;

/// Configuration for the manager.
#[derive(Debug, Clone, Default)]
pub struct ManagerConfig {
    /// Invoke `decide` twice per decision task and treat divergent output
    /// as fatal to that task.
    ///
    /// Decision logic depending on anything outside the history is a
    /// programming error with no safe recovery; this check surfaces it
    /// instead of silently accepting whichever answer came first.
    pub verify_determinism: bool,
}

/// Type-erased activity entry for dynamic dispatch.
///
/// Captures the concrete [`Activity`] type at registration and folds its
/// error channel into [`ActivityResult::Failed`], so the manager can hold
/// heterogeneous activities in one map.
#[async_trait]
trait ActivityEntry: Send + Sync {
    async fn run(&self, input: Value, ctx: &ActivityContext) -> ActivityResult;
}

struct TypedActivityEntry<A: Activity> {
    activity: A,
}

#[async_trait]
impl<A: Activity> ActivityEntry for TypedActivityEntry<A> {
    async fn run(&self, input: Value, ctx: &ActivityContext) -> ActivityResult {
        match self.activity.execute(input, ctx).await {
            Ok(result) => result,
            Err(error) => ActivityResult::Failed {
                error: error.to_string(),
            },
        }
    }
}

struct ActivityRegistration {
    entry: Box<dyn ActivityEntry>,
    options: ActivityOptions,
}

/// Heartbeat sink wired to a backend.
struct BackendHeartbeater<B: Backend> {
    backend: B,
}

#[async_trait]
impl<B: Backend> Heartbeater for BackendHeartbeater<B> {
    async fn record(&self, token: &TaskToken) -> Result<HeartbeatStatus> {
        self.backend.record_heartbeat(token).await
    }
}

/// Builder for constructing a [`Manager`].
///
/// Duplicate type registrations are detected here but reported at
/// [`build`](Self::build) time.
///
/// # Example
///
/// ```ignore
/// let manager = Manager::builder(MemoryBackend::default())
///     .register_workflow("foo", FooWorkflow)
///     .register_activity("multiplication", MultiplicationActivity, ActivityOptions::default())
///     .build()?;
/// ```
pub struct ManagerBuilder<B: Backend> {
    backend: B,
    workflows: HashMap<String, Box<dyn Workflow>>,
    activities: HashMap<String, ActivityRegistration>,
    duplicate_workflow_type: Option<String>,
    duplicate_activity_type: Option<String>,
    config: ManagerConfig,
}

impl<B: Backend> ManagerBuilder<B> {
    fn new(backend: B) -> Self {
        Self {
            backend,
            workflows: HashMap::new(),
            activities: HashMap::new(),
            duplicate_workflow_type: None,
            duplicate_activity_type: None,
            config: ManagerConfig::default(),
        }
    }

    /// Register decision logic under a workflow type name.
    pub fn register_workflow(mut self, name: impl Into<String>, workflow: impl Workflow) -> Self {
        let name = name.into();
        if self.workflows.contains_key(&name) {
            if self.duplicate_workflow_type.is_none() {
                self.duplicate_workflow_type = Some(name);
            }
            return self;
        }
        self.workflows.insert(name, Box::new(workflow));
        self
    }

    /// Register execution logic under an activity type name, with the
    /// timeout defaults applied to bare `ScheduleActivity` decisions.
    pub fn register_activity(
        mut self,
        name: impl Into<String>,
        activity: impl Activity,
        options: ActivityOptions,
    ) -> Self {
        let name = name.into();
        if self.activities.contains_key(&name) {
            if self.duplicate_activity_type.is_none() {
                self.duplicate_activity_type = Some(name);
            }
            return self;
        }
        self.activities.insert(
            name,
            ActivityRegistration {
                entry: Box::new(TypedActivityEntry { activity }),
                options,
            },
        );
        self
    }

    /// Set the manager configuration.
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the manager.
    pub fn build(self) -> Result<Manager<B>> {
        if let Some(name) = self.duplicate_workflow_type {
            return Err(Error::DuplicateWorkflowType(name));
        }
        if let Some(name) = self.duplicate_activity_type {
            return Err(Error::DuplicateActivityType(name));
        }
        let heartbeater: Arc<dyn Heartbeater> = Arc::new(BackendHeartbeater {
            backend: self.backend.clone(),
        });
        Ok(Manager {
            backend: self.backend,
            workflows: self.workflows,
            activities: self.activities,
            heartbeater,
            config: self.config,
        })
    }
}

/// Binds a [`Backend`] to name-keyed registries of workflow and activity
/// types, translating decisions into backend calls and backend tasks into
/// workflow/activity invocations.
///
/// A manager is shared across workers via [`Arc`]; it holds no per-task
/// state. The polling loops in [`runtime`](crate::runtime) drive
/// [`run_one_decision_task`](Self::run_one_decision_task) and
/// [`run_one_activity_task`](Self::run_one_activity_task).
pub struct Manager<B: Backend> {
    backend: B,
    workflows: HashMap<String, Box<dyn Workflow>>,
    activities: HashMap<String, ActivityRegistration>,
    heartbeater: Arc<dyn Heartbeater>,
    config: ManagerConfig,
}

impl<B: Backend> std::fmt::Debug for Manager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("workflows", &self.workflows.keys().collect::<Vec<_>>())
            .field("activities", &self.activities.keys().collect::<Vec<_>>())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<B: Backend> Manager<B> {
    /// Create a new manager builder.
    pub fn builder(backend: B) -> ManagerBuilder<B> {
        ManagerBuilder::new(backend)
    }

    /// Borrow the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Registered activity type names.
    pub fn activity_types(&self) -> impl Iterator<Item = &str> {
        self.activities.keys().map(String::as_str)
    }

    /// Number of registered workflow types.
    pub fn workflow_count(&self) -> usize {
        self.workflows.len()
    }

    /// Start a process of a registered workflow type.
    pub async fn start_process(&self, workflow_type: &str, input: Value) -> Result<ProcessId> {
        if !self.workflows.contains_key(workflow_type) {
            return Err(Error::UnknownWorkflowType(workflow_type.to_owned()));
        }
        self.backend.start_process(workflow_type, input).await
    }

    /// Deliver a signal to a running process.
    pub async fn signal_process(&self, process_id: &ProcessId, signal: Signal) -> Result<()> {
        self.backend.signal_process(process_id, signal).await
    }

    /// Poll for one decision task and, if present, run it to commit.
    ///
    /// Reconstructs the process from the task's history snapshot, invokes
    /// the registered workflow's `decide`, resolves `ScheduleActivity`
    /// shorthands against the activity registry, and commits the resolved
    /// decisions. Returns whether a task was processed.
    pub async fn run_one_decision_task(&self) -> Result<bool> {
        let Some(task) = self.backend.poll_decision_task().await? else {
            return Ok(false);
        };

        let process = Process::replay(task.process_id, task.history)?;
        let Some(workflow) = self.workflows.get(process.workflow_type.as_str()) else {
            return Err(Error::UnknownWorkflowType(process.workflow_type));
        };

        let decisions = workflow.decide(&process);
        if self.config.verify_determinism && workflow.decide(&process) != decisions {
            return Err(Error::NondeterministicDecisions {
                process_id: process.id,
            });
        }

        let resolved = self.resolve_decisions(&process, decisions)?;
        self.backend
            .complete_decision_task(&task.token, resolved)
            .await?;
        Ok(true)
    }

    /// Poll for one activity task of the given type and, if present, run it
    /// to commit.
    ///
    /// Instantiates a fresh [`ActivityContext`] with the heartbeat channel
    /// wired to the backend, executes the registered activity, and commits
    /// whatever it returns. Returns whether a task was processed.
    pub async fn run_one_activity_task(&self, activity_type: &str) -> Result<bool> {
        let Some(registration) = self.activities.get(activity_type) else {
            return Err(Error::UnknownActivityType(activity_type.to_owned()));
        };
        let Some(task) = self.backend.poll_activity_task(activity_type).await? else {
            return Ok(false);
        };

        let ctx = ActivityContext::new(
            task.token,
            task.activity_type.clone(),
            Arc::clone(&self.heartbeater),
        );
        let result = registration.entry.run(task.input, &ctx).await;

        self.backend
            .complete_activity_task(&task.token, result)
            .await?;
        Ok(true)
    }

    /// Resolve `ScheduleActivity` shorthands: a missing input becomes the
    /// process's own input, missing options become the registered defaults.
    fn resolve_decisions(
        &self,
        process: &Process,
        decisions: Vec<Decision>,
    ) -> Result<Vec<Decision>> {
        decisions
            .into_iter()
            .map(|decision| match decision {
                Decision::ScheduleActivity {
                    activity_type,
                    input,
                    options,
                } => {
                    let Some(registration) = self.activities.get(&activity_type) else {
                        return Err(Error::UnknownActivityType(activity_type));
                    };
                    Ok(Decision::ScheduleActivity {
                        input: Some(input.unwrap_or_else(|| process.input.clone())),
                        options: Some(options.unwrap_or_else(|| registration.options.clone())),
                        activity_type,
                    })
                }
                other => Ok(other),
            })
            .collect()
    }
}
