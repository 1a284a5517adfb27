//! Shared workflows and activities for integration tests.

use async_trait::async_trait;
use serde_json::Value;
use windlass::backend::Backend;
use windlass::{
    Activity, ActivityContext, ActivityResult, Decision, Manager, MemoryBackend, Process,
    ProcessId, Workflow,
};

/// Single-activity workflow used by the end-to-end scenarios.
///
/// Schedules the multiplication activity with the process's own input, then
/// settles the process from the activity's outcome: completed result ends
/// the process, a canceled or failed activity fails it.
pub struct FooWorkflow;

impl Workflow for FooWorkflow {
    fn decide(&self, process: &Process) -> Vec<Decision> {
        let history = &process.history;

        if let Some((_, result)) = history.completed_activities().last() {
            return vec![Decision::complete(result.clone())];
        }
        if let Some((_, reason)) = history.canceled_activities().last() {
            return vec![Decision::fail(reason.unwrap_or("activity canceled").to_owned())];
        }
        if let Some((_, error)) = history.failed_activities().last() {
            return vec![Decision::fail(error.to_owned())];
        }
        if history.timed_out_activities().next().is_some() {
            return vec![Decision::fail("multiplication timed out")];
        }
        if history.scheduled_activities().next().is_none() {
            return vec![Decision::schedule("multiplication")];
        }
        vec![]
    }
}

/// Multiplies `input[0] * input[1]` by repeated addition, one heartbeat per
/// round, refusing first operands above 10.
pub struct MultiplicationActivity;

#[async_trait]
impl Activity for MultiplicationActivity {
    type Error = anyhow::Error;

    async fn execute(
        &self,
        input: Value,
        ctx: &ActivityContext,
    ) -> Result<ActivityResult, Self::Error> {
        let operands: Vec<i64> = serde_json::from_value(input)?;
        let &[first, second] = operands.as_slice() else {
            anyhow::bail!("expected exactly two operands");
        };
        if first > 10 {
            return Ok(ActivityResult::canceled("first operand must be <= 10"));
        }

        let mut acc = 0;
        for _ in 0..first {
            if ctx.heartbeat().await?.is_cancel_requested() {
                return Ok(ActivityResult::canceled("cancel requested"));
            }
            acc += second;
        }
        Ok(ActivityResult::success(acc))
    }
}

/// Workflow that idles until an `approve` or `reject` signal arrives.
pub struct ApprovalWorkflow;

impl Workflow for ApprovalWorkflow {
    fn decide(&self, process: &Process) -> Vec<Decision> {
        for (name, payload) in process.history.signals() {
            match name {
                "approve" => return vec![Decision::complete(payload.clone())],
                "reject" => return vec![Decision::fail("rejected")],
                _ => {}
            }
        }
        vec![]
    }
}

/// Workflow that schedules the slow activity, then cancels the whole
/// process when a `cancel` signal arrives.
pub struct CancelOnSignalWorkflow;

impl Workflow for CancelOnSignalWorkflow {
    fn decide(&self, process: &Process) -> Vec<Decision> {
        if process.history.signals().any(|(name, _)| name == "cancel") {
            return vec![Decision::cancel_with("operator request")];
        }
        if process.history.scheduled_activities().next().is_none() {
            return vec![Decision::schedule("slow")];
        }
        vec![]
    }
}

/// Activity that heartbeats in a loop until asked to cancel.
pub struct SlowActivity;

#[async_trait]
impl Activity for SlowActivity {
    type Error = anyhow::Error;

    async fn execute(
        &self,
        _input: Value,
        ctx: &ActivityContext,
    ) -> Result<ActivityResult, Self::Error> {
        for _ in 0..500 {
            if ctx.heartbeat().await?.is_cancel_requested() {
                return Ok(ActivityResult::canceled("cancel requested"));
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        Ok(ActivityResult::success("finished uncanceled"))
    }
}

/// Route worker logs to the test harness. Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Drive decision and activity workers inline until the process closes.
///
/// `store` must be the memory backend underlying the manager (or a clone of
/// it) so the final process state can be observed.
pub async fn drive_to_close<B: Backend>(
    manager: &Manager<B>,
    activity_types: &[&str],
    store: &MemoryBackend,
    process_id: &ProcessId,
) -> Process {
    for _ in 0..50 {
        manager
            .run_one_decision_task()
            .await
            .expect("decision task failed");
        for activity_type in activity_types {
            manager
                .run_one_activity_task(activity_type)
                .await
                .expect("activity task failed");
        }
        if let Some(process) = store.process(process_id).await {
            if process.is_closed() {
                return process;
            }
        }
    }
    panic!("process {process_id} did not reach a terminal status");
}
