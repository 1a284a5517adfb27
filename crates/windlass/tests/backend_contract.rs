//! Contract tests driving the memory backend through the `Backend` trait
//! directly: token lifecycle, timeout transitions, terminal immutability.

use std::time::Duration;

use serde_json::json;
use windlass::backend::Backend;
use windlass::{
    ActivityOptions, ActivityResult, Decision, Error, EventKind, MemoryBackend,
    MemoryBackendConfig, ProcessStatus, Signal, TimeoutKind,
};

/// Schedule decision used throughout: explicit input and options so the
/// backend applies exactly the bounds under test.
fn schedule(options: ActivityOptions) -> Decision {
    Decision::schedule("multiplication")
        .with_input(json!([5, 3]))
        .with_options(options)
}

#[tokio::test]
async fn decision_commit_is_single_use() {
    let backend = MemoryBackend::default();
    let process_id = backend.start_process("foo", json!([5, 3])).await.unwrap();

    let task = backend.poll_decision_task().await.unwrap().unwrap();
    let decisions = vec![schedule(ActivityOptions::default())];
    backend
        .complete_decision_task(&task.token, decisions.clone())
        .await
        .unwrap();

    let history_len = backend.process(&process_id).await.unwrap().history.len();

    // Simulated redelivery: the same commit again must be rejected stale
    // and must not duplicate any event.
    let err = backend
        .complete_decision_task(&task.token, decisions)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StaleTaskToken(_)));

    let process = backend.process(&process_id).await.unwrap();
    assert_eq!(process.history.len(), history_len);
    assert_eq!(process.history.scheduled_activities().count(), 1);
}

#[tokio::test]
async fn activity_completion_is_single_use() {
    let backend = MemoryBackend::default();
    let process_id = backend.start_process("foo", json!([5, 3])).await.unwrap();

    let decision_task = backend.poll_decision_task().await.unwrap().unwrap();
    backend
        .complete_decision_task(&decision_task.token, vec![schedule(ActivityOptions::default())])
        .await
        .unwrap();

    let task = backend
        .poll_activity_task("multiplication")
        .await
        .unwrap()
        .unwrap();
    backend
        .complete_activity_task(&task.token, ActivityResult::success(15))
        .await
        .unwrap();

    let err = backend
        .complete_activity_task(&task.token, ActivityResult::success(999))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StaleTaskToken(_)));

    let process = backend.process(&process_id).await.unwrap();
    let completed: Vec<_> = process.history.completed_activities().collect();
    assert_eq!(completed, vec![("multiplication", &json!(15))]);

    // Heartbeating a consumed token is just as stale.
    let err = backend.record_heartbeat(&task.token).await.unwrap_err();
    assert!(matches!(err, Error::StaleTaskToken(_)));
}

#[tokio::test]
async fn undispatched_task_times_out_schedule_to_start() {
    let backend = MemoryBackend::default();
    let process_id = backend.start_process("foo", json!([5, 3])).await.unwrap();

    let decision_task = backend.poll_decision_task().await.unwrap().unwrap();
    let options = ActivityOptions::default().with_scheduled_timeout(Duration::from_millis(50));
    backend
        .complete_decision_task(&decision_task.token, vec![schedule(options)])
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    // The expired entry is never dispatched.
    assert!(
        backend
            .poll_activity_task("multiplication")
            .await
            .unwrap()
            .is_none()
    );

    let process = backend.process(&process_id).await.unwrap();
    let timeouts: Vec<_> = process.history.timed_out_activities().collect();
    assert_eq!(
        timeouts,
        vec![("multiplication", TimeoutKind::ScheduleToStart)]
    );

    // A fresh decision task follows so workflow logic can react.
    let follow_up = backend.poll_decision_task().await.unwrap().unwrap();
    assert_eq!(follow_up.process_id, process_id);
}

#[tokio::test]
async fn silent_task_times_out_heartbeat() {
    let backend = MemoryBackend::default();
    let process_id = backend.start_process("foo", json!([5, 3])).await.unwrap();

    let decision_task = backend.poll_decision_task().await.unwrap().unwrap();
    let options = ActivityOptions::default()
        .with_execution_timeout(Duration::from_secs(60))
        .with_heartbeat_timeout(Duration::from_millis(50));
    backend
        .complete_decision_task(&decision_task.token, vec![schedule(options)])
        .await
        .unwrap();

    let task = backend
        .poll_activity_task("multiplication")
        .await
        .unwrap()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    let err = backend.record_heartbeat(&task.token).await.unwrap_err();
    assert!(matches!(err, Error::StaleTaskToken(_)));

    let process = backend.process(&process_id).await.unwrap();
    let timeouts: Vec<_> = process.history.timed_out_activities().collect();
    assert_eq!(timeouts, vec![("multiplication", TimeoutKind::Heartbeat)]);
}

#[tokio::test]
async fn overrunning_task_times_out_start_to_close() {
    let backend = MemoryBackend::default();
    let process_id = backend.start_process("foo", json!([5, 3])).await.unwrap();

    let decision_task = backend.poll_decision_task().await.unwrap().unwrap();
    let options = ActivityOptions::default().with_execution_timeout(Duration::from_millis(50));
    backend
        .complete_decision_task(&decision_task.token, vec![schedule(options)])
        .await
        .unwrap();

    let task = backend
        .poll_activity_task("multiplication")
        .await
        .unwrap()
        .unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    let err = backend
        .complete_activity_task(&task.token, ActivityResult::success(15))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StaleTaskToken(_)));

    let process = backend.process(&process_id).await.unwrap();
    let timeouts: Vec<_> = process.history.timed_out_activities().collect();
    assert_eq!(timeouts, vec![("multiplication", TimeoutKind::StartToClose)]);
}

#[tokio::test]
async fn heartbeats_keep_a_slow_task_alive() {
    let backend = MemoryBackend::default();
    let process_id = backend.start_process("foo", json!([5, 3])).await.unwrap();

    let decision_task = backend.poll_decision_task().await.unwrap().unwrap();
    let options = ActivityOptions::default()
        .with_execution_timeout(Duration::from_secs(60))
        .with_heartbeat_timeout(Duration::from_millis(300));
    backend
        .complete_decision_task(&decision_task.token, vec![schedule(options)])
        .await
        .unwrap();

    let task = backend
        .poll_activity_task("multiplication")
        .await
        .unwrap()
        .unwrap();

    // Total runtime exceeds the heartbeat bound, but each gap stays inside it.
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let status = backend.record_heartbeat(&task.token).await.unwrap();
        assert!(!status.is_cancel_requested());
    }

    backend
        .complete_activity_task(&task.token, ActivityResult::success(15))
        .await
        .unwrap();

    let process = backend.process(&process_id).await.unwrap();
    assert_eq!(process.history.completed_activities().count(), 1);
    assert!(process.history.timed_out_activities().next().is_none());
}

#[tokio::test]
async fn abandoned_decision_task_is_reenqueued() {
    let backend = MemoryBackend::new(MemoryBackendConfig {
        decision_timeout: Duration::from_millis(50),
        ..Default::default()
    });
    let process_id = backend.start_process("foo", json!([5, 3])).await.unwrap();

    let first = backend.poll_decision_task().await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The abandoned dispatch is invalidated and a fresh one handed out.
    let second = backend.poll_decision_task().await.unwrap().unwrap();
    assert_eq!(second.process_id, process_id);
    assert_ne!(second.token, first.token);

    let err = backend
        .complete_decision_task(&first.token, vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::StaleTaskToken(_)));

    backend
        .complete_decision_task(&second.token, vec![])
        .await
        .unwrap();
}

#[tokio::test]
async fn terminal_process_rejects_signals_and_late_results() {
    let backend = MemoryBackend::default();
    let process_id = backend.start_process("foo", json!([5, 3])).await.unwrap();

    let decision_task = backend.poll_decision_task().await.unwrap().unwrap();
    backend
        .complete_decision_task(&decision_task.token, vec![Decision::complete(json!(15))])
        .await
        .unwrap();

    let process = backend.process(&process_id).await.unwrap();
    assert_eq!(process.status, ProcessStatus::Completed { result: json!(15) });
    let history_len = process.history.len();

    let err = backend
        .signal_process(&process_id, Signal::new("poke", json!(null)))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProcessClosed(_)));

    let process = backend.process(&process_id).await.unwrap();
    assert_eq!(process.history.len(), history_len);
    assert!(matches!(
        process.history.last().map(|event| &event.kind),
        Some(EventKind::ProcessCompleted { .. })
    ));
}

#[tokio::test]
async fn cancel_decision_marks_running_work_and_drops_queued_work() {
    let backend = MemoryBackend::default();
    let process_id = backend.start_process("foo", json!([5, 3])).await.unwrap();

    let decision_task = backend.poll_decision_task().await.unwrap().unwrap();
    let options = ActivityOptions::default().with_heartbeat_timeout(Duration::from_secs(60));
    backend
        .complete_decision_task(
            &decision_task.token,
            vec![schedule(options.clone()), schedule(options)],
        )
        .await
        .unwrap();

    // Dispatch one of the two; the other stays queued.
    let running = backend
        .poll_activity_task("multiplication")
        .await
        .unwrap()
        .unwrap();
    assert!(
        !backend
            .record_heartbeat(&running.token)
            .await
            .unwrap()
            .is_cancel_requested()
    );

    // A signal enqueues the decision point that cancels the process.
    backend
        .signal_process(&process_id, Signal::new("cancel", json!(null)))
        .await
        .unwrap();
    let decision_task = backend.poll_decision_task().await.unwrap().unwrap();
    backend
        .complete_decision_task(&decision_task.token, vec![Decision::cancel_with("operator")])
        .await
        .unwrap();

    // Queued work is gone, running work sees the cancel at its next
    // heartbeat, and its late result is dropped.
    assert!(
        backend
            .poll_activity_task("multiplication")
            .await
            .unwrap()
            .is_none()
    );
    assert!(
        backend
            .record_heartbeat(&running.token)
            .await
            .unwrap()
            .is_cancel_requested()
    );
    backend
        .complete_activity_task(&running.token, ActivityResult::canceled("cancel requested"))
        .await
        .unwrap();

    let process = backend.process(&process_id).await.unwrap();
    assert_eq!(
        process.status,
        ProcessStatus::Canceled {
            reason: Some("operator".into())
        }
    );
    assert!(matches!(
        process.history.last().map(|event| &event.kind),
        Some(EventKind::ProcessCanceled { .. })
    ));
}

#[tokio::test]
async fn failed_result_is_recorded_verbatim() {
    let backend = MemoryBackend::default();
    let process_id = backend.start_process("foo", json!([5, 3])).await.unwrap();

    let decision_task = backend.poll_decision_task().await.unwrap().unwrap();
    backend
        .complete_decision_task(&decision_task.token, vec![schedule(ActivityOptions::default())])
        .await
        .unwrap();

    let task = backend
        .poll_activity_task("multiplication")
        .await
        .unwrap()
        .unwrap();
    backend
        .complete_activity_task(&task.token, ActivityResult::failed("division by zero"))
        .await
        .unwrap();

    let process = backend.process(&process_id).await.unwrap();
    let failed: Vec<_> = process.history.failed_activities().collect();
    assert_eq!(failed, vec![("multiplication", "division by zero")]);
}
