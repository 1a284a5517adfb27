//! Worker pool: spawns workers and coordinates their shutdown.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

use super::{ActivityWorker, DecisionWorker, RuntimeConfig};
use crate::backend::Backend;
use crate::error::Result;
use crate::manager::Manager;

/// Runs decision and activity workers against a shared [`Manager`].
///
/// The pool spawns `decision_workers` decision loops plus `activity_workers`
/// loops for every registered activity type, then waits for the provided
/// shutdown future. Workers are cancellable tasks scoped by an explicit stop
/// signal; nothing relies on external thread termination.
///
/// # Shutdown behavior
///
/// When the shutdown future completes:
/// 1. All workers stop claiming new work
/// 2. In-flight work (if any) is given time to complete
/// 3. The pool returns after at most `shutdown_timeout`
///
/// # Example
///
/// ```ignore
/// let pool = WorkerPool::new(Arc::new(manager), RuntimeConfig::default());
///
/// // Run until Ctrl+C
/// pool.run(async { tokio::signal::ctrl_c().await.ok(); }).await?;
/// ```
pub struct WorkerPool<B: Backend> {
    manager: Arc<Manager<B>>,
    config: RuntimeConfig,
}

impl<B: Backend> WorkerPool<B> {
    /// Create a pool over a shared manager.
    pub fn new(manager: Arc<Manager<B>>, config: RuntimeConfig) -> Self {
        Self { manager, config }
    }

    /// Returns the pool configuration.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run the workers until the shutdown future completes.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let pool_id = self
            .config
            .worker_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let decision_worker_count = self.config.decision_workers.max(1);
        let activity_worker_count = self.config.activity_workers.max(1);

        info!(
            worker_id = %pool_id,
            workflows = self.manager.workflow_count(),
            decision_workers = decision_worker_count,
            activity_workers_per_type = activity_worker_count,
            "Worker pool starting"
        );

        let mut worker_handles = Vec::new();

        for i in 0..decision_worker_count {
            let worker_id = if decision_worker_count == 1 {
                format!("{pool_id}-decision")
            } else {
                format!("{pool_id}-decision-{i}")
            };
            let worker =
                DecisionWorker::new(Arc::clone(&self.manager), self.config.clone(), worker_id);
            let worker_shutdown_rx = shutdown_rx.clone();
            worker_handles.push(tokio::spawn(async move {
                worker.run(worker_shutdown_rx).await;
            }));
        }

        let activity_types: Vec<String> = self
            .manager
            .activity_types()
            .map(str::to_owned)
            .collect();
        for activity_type in activity_types {
            for i in 0..activity_worker_count {
                let worker_id = if activity_worker_count == 1 {
                    format!("{pool_id}-{activity_type}")
                } else {
                    format!("{pool_id}-{activity_type}-{i}")
                };
                let worker = ActivityWorker::new(
                    Arc::clone(&self.manager),
                    activity_type.clone(),
                    self.config.clone(),
                    worker_id,
                );
                let worker_shutdown_rx = shutdown_rx.clone();
                worker_handles.push(tokio::spawn(async move {
                    worker.run(worker_shutdown_rx).await;
                }));
            }
        }

        // Wait for the shutdown signal, then stop all workers.
        shutdown.await;
        let _ = shutdown_tx.send(true);

        let shutdown_timeout = self.config.shutdown_timeout;
        let all_workers = async {
            for handle in worker_handles {
                let _ = handle.await;
            }
        };

        match tokio::time::timeout(shutdown_timeout, all_workers).await {
            Ok(()) => {
                info!(worker_id = %pool_id, "Worker pool stopped gracefully");
            }
            Err(_) => {
                warn!(
                    worker_id = %pool_id,
                    timeout_secs = shutdown_timeout.as_secs(),
                    "Shutdown timeout exceeded, forcing stop"
                );
            }
        }

        Ok(())
    }
}
