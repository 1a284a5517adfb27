//! Decision worker: polls for decision tasks and runs them to commit.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info};

use super::RuntimeConfig;
use crate::backend::Backend;
use crate::manager::Manager;

/// Polling loop over [`Manager::run_one_decision_task`].
///
/// Within one worker execution is sequential: poll, replay, decide, commit,
/// poll again. Errors are logged and the loop continues; a failed poll or
/// commit leaves backend state intact, and an abandoned decision task is
/// re-enqueued by the backend's decision timeout.
pub(crate) struct DecisionWorker<B: Backend> {
    manager: Arc<Manager<B>>,
    config: RuntimeConfig,
    worker_id: String,
}

impl<B: Backend> DecisionWorker<B> {
    /// Create a new decision worker.
    pub(crate) fn new(manager: Arc<Manager<B>>, config: RuntimeConfig, worker_id: String) -> Self {
        Self {
            manager,
            config,
            worker_id,
        }
    }

    /// Run until the shutdown receiver signals.
    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut poll_interval = interval(self.config.decision_poll_interval);
        poll_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(worker_id = %self.worker_id, "Decision worker started");

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    if let Err(e) = self.manager.run_one_decision_task().await {
                        error!(worker_id = %self.worker_id, error = %e, "Error processing decision task");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(worker_id = %self.worker_id, "Decision worker shutting down");
                        break;
                    }
                }
            }
        }
    }
}
