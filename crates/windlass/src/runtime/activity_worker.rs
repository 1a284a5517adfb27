//! Activity worker: polls one activity type and executes dispatched tasks.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::interval;
use tracing::{error, info};

use super::RuntimeConfig;
use crate::backend::Backend;
use crate::manager::Manager;

/// Polling loop over [`Manager::run_one_activity_task`] for one activity type.
///
/// A long-running execution blocks this worker's loop but no other worker;
/// concurrency comes from running more workers, not from overlapping tasks
/// within one.
pub(crate) struct ActivityWorker<B: Backend> {
    manager: Arc<Manager<B>>,
    activity_type: String,
    config: RuntimeConfig,
    worker_id: String,
}

impl<B: Backend> ActivityWorker<B> {
    /// Create a new activity worker for one activity type.
    pub(crate) fn new(
        manager: Arc<Manager<B>>,
        activity_type: String,
        config: RuntimeConfig,
        worker_id: String,
    ) -> Self {
        Self {
            manager,
            activity_type,
            config,
            worker_id,
        }
    }

    /// Run until the shutdown receiver signals.
    pub(crate) async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut poll_interval = interval(self.config.activity_poll_interval);
        poll_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            worker_id = %self.worker_id,
            activity_type = %self.activity_type,
            "Activity worker started"
        );

        loop {
            tokio::select! {
                _ = poll_interval.tick() => {
                    if let Err(e) = self.manager.run_one_activity_task(&self.activity_type).await {
                        error!(
                            worker_id = %self.worker_id,
                            activity_type = %self.activity_type,
                            error = %e,
                            "Error processing activity task"
                        );
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(worker_id = %self.worker_id, "Activity worker shutting down");
                        break;
                    }
                }
            }
        }
    }
}
