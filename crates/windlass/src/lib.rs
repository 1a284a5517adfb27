//! Backend-agnostic workflow orchestration core.
//!
//! Windlass lets you express a long-running business process as a sequence
//! of discrete, independently retryable activities, driven by decision
//! logic that is replayed against an append-only event history rather than
//! invoked once per process lifetime:
//!
//! - **Deterministic decisions** — [`Workflow::decide`] is a pure function
//!   of the history and can be safely re-invoked after crashes and
//!   redelivery
//! - **Crash-tolerant activities** — [`Activity::execute`] heartbeats,
//!   observes cooperative cancellation, and is bounded by three timeout
//!   clocks
//! - **Exactly-once-effective commits** — every dispatched task carries a
//!   single-use [`TaskToken`]; stale completions are rejected and change
//!   nothing
//!
//! # Architecture
//!
//! ```text
//! start_process ──► Backend ──► DecisionTask ──► DecisionWorker
//!                     ▲                              │ replay history,
//!                     │ events + follow-on tasks,    │ decide()
//!                     │ committed atomically         ▼
//!                ActivityWorker ◄── ActivityTask ◄── complete_decision_task
//!                     │ execute() + heartbeats
//!                     └──► complete_activity_task ──► fresh DecisionTask
//! ```
//!
//! The [`backend::Backend`] trait is the only seam between the core and a
//! concrete queue/datastore; [`backend::MemoryBackend`] is the in-process
//! reference implementation.
//!
//! # Example
//!
//! ```ignore
//! use windlass::{ActivityOptions, Decision, Manager, MemoryBackend};
//! use windlass::runtime::{RuntimeConfig, WorkerPool};
//!
//! let manager = Manager::builder(MemoryBackend::default())
//!     .register_workflow("foo", FooWorkflow)
//!     .register_activity("multiplication", MultiplicationActivity, ActivityOptions::default())
//!     .build()?;
//! let manager = std::sync::Arc::new(manager);
//!
//! let process_id = manager.start_process("foo", serde_json::json!([5, 3])).await?;
//!
//! let pool = WorkerPool::new(manager, RuntimeConfig::default());
//! pool.run(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! ```

mod activity;
pub mod backend;
mod decision;
mod error;
mod event;
mod manager;
mod process;
pub mod runtime;
mod task;
mod workflow;

pub use activity::{Activity, ActivityContext, ActivityResult, HeartbeatStatus, Heartbeater};
pub use backend::{Backend, MemoryBackend, MemoryBackendConfig, NotifyingBackend};
pub use decision::Decision;
pub use error::{Error, Result};
pub use event::{Event, EventKind, History, TimeoutKind};
pub use manager::{Manager, ManagerBuilder, ManagerConfig};
pub use process::{Process, ProcessId, ProcessStatus, Signal};
pub use runtime::{RuntimeConfig, WorkerPool};
pub use task::{ActivityOptions, ActivityTask, DecisionTask, TaskToken};
pub use workflow::Workflow;
