//! Polling workers that drive a manager.
//!
//! - [`WorkerPool`] — spawns decision and activity workers and runs them
//!   until a shutdown future completes
//! - [`RuntimeConfig`] — polling intervals, worker counts, shutdown timeout
//!
//! # Example
//!
//! ```ignore
//! use windlass::runtime::{RuntimeConfig, WorkerPool};
//!
//! let pool = WorkerPool::new(Arc::new(manager), RuntimeConfig::default());
//! pool.run(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! ```

mod activity_worker;
mod config;
mod decision_worker;
mod pool;

pub use config::RuntimeConfig;
pub use pool::WorkerPool;

pub(crate) use activity_worker::ActivityWorker;
pub(crate) use decision_worker::DecisionWorker;
