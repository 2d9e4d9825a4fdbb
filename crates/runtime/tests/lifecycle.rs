mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use bot_core::{Action, ActionType};
use bot_runtime::{ActionScheduler, RuntimeError, SchedulerEvent, SubmitError};
use common::{config, log, movement, recording, started, wait_until};

#[tokio::test(start_paused = true)]
async fn submitted_action_round_trip() {
    let scheduler = ActionScheduler::new(config());
    let log = log();
    scheduler.start().unwrap();
    assert!(scheduler.is_running());

    assert!(
        scheduler
            .submit(recording(ActionType::Attack, "targeting", "attack", &log))
            .await
    );
    assert_eq!(scheduler.get_queue_size(), 1);
    assert_eq!(scheduler.get_stats().submitted, 1);

    wait_until(Duration::from_secs(5), || log.lock().len() == 1).await;
    assert_eq!(scheduler.get_queue_size(), 0);

    let stats = scheduler.get_stats();
    assert_eq!(stats.executed, 1);
    assert_eq!(stats.failed, 0);

    scheduler.stop().await.unwrap();
    assert!(!scheduler.is_running());
}

#[tokio::test(start_paused = true)]
async fn submit_is_rejected_when_not_running() {
    let scheduler = ActionScheduler::new(config());
    let action = Action::new(ActionType::Attack, "targeting", || Ok(true));

    assert!(matches!(
        scheduler.try_submit(action).await,
        Err(SubmitError::NotRunning)
    ));
    assert_eq!(scheduler.get_queue_size(), 0);
    assert_eq!(scheduler.get_stats().submitted, 0);

    let stop = Action::new(ActionType::EmergencyStop, "alarm", || Ok(true));
    assert!(!scheduler.submit_immediate(stop).await);
}

#[tokio::test(start_paused = true)]
async fn start_and_stop_are_idempotent() {
    let scheduler = started(config());
    scheduler.start().unwrap();
    assert!(scheduler.is_running());

    scheduler.stop().await.unwrap();
    scheduler.stop().await.unwrap();
    assert!(!scheduler.is_running());

    // Restart after stop.
    let log = log();
    scheduler.start().unwrap();
    scheduler
        .submit(recording(ActionType::Say, "responder", "again", &log))
        .await;
    wait_until(Duration::from_secs(5), || log.lock().len() == 1).await;
    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stop_clears_pending_and_blocked() {
    let scheduler = started(config());
    let _moving = movement(&scheduler, true);
    let log = log();

    scheduler
        .submit(recording(ActionType::Loot, "looter", "loot", &log))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(scheduler.get_blocked_count(), 1);

    // Keyboard actions are held back by a closed gate so they stay queued.
    scheduler.set_state_checker(|| true, || false);
    for _ in 0..3 {
        scheduler
            .submit(recording(ActionType::Say, "responder", "say", &log))
            .await;
    }
    assert!(scheduler.get_queue_size() >= 2);

    scheduler.stop().await.unwrap();
    assert_eq!(scheduler.get_queue_size(), 0);
    assert_eq!(scheduler.get_blocked_count(), 0);
    assert!(log.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn clear_module_actions_only_touches_that_module() {
    let scheduler = started(config());
    let moving = movement(&scheduler, true);
    let log = log();

    scheduler
        .submit(recording(ActionType::UseItemOn, "trainer", "trainer-blocked", &log))
        .await;
    scheduler
        .submit(recording(ActionType::Loot, "looter", "loot", &log))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(scheduler.get_blocked_count(), 2);

    scheduler
        .submit(recording(ActionType::MoveItem, "trainer", "trainer-pending", &log))
        .await;
    assert_eq!(scheduler.get_queue_size(), 1);

    assert_eq!(scheduler.clear_module_actions("trainer"), 2);
    assert_eq!(scheduler.get_queue_size(), 0);
    assert_eq!(scheduler.get_blocked_count(), 1);

    moving.store(false, Ordering::SeqCst);
    wait_until(Duration::from_secs(5), || log.lock().len() == 1).await;
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(common::labels(&log), vec!["loot"]);

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn clear_queue_reports_removed_count() {
    let scheduler = ActionScheduler::new(config());
    scheduler.start().unwrap();
    let _moving = movement(&scheduler, true);
    scheduler.set_state_checker(|| true, || false);

    for module in ["a", "b", "c"] {
        scheduler
            .submit(Action::new(ActionType::Say, module, || Ok(true)))
            .await;
    }
    assert_eq!(scheduler.clear_queue(), 3);
    assert_eq!(scheduler.get_queue_size(), 0);

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn emergency_stop_bypasses_the_queue() {
    let scheduler = started(config());
    let _moving = movement(&scheduler, true);
    let log = log();

    scheduler
        .submit(recording(ActionType::Loot, "looter", "loot", &log))
        .await;
    let stop = recording(ActionType::EmergencyStop, "alarm", "stop", &log);

    assert!(scheduler.submit(stop).await);
    assert_eq!(common::labels(&log), vec!["stop"]);

    let stats = scheduler.get_stats();
    assert_eq!(stats.immediate, 1);
    assert_eq!(stats.submitted, 1);
    assert_eq!(stats.executed, 1);

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_immediate_action_reports_false() {
    let scheduler = started(config());
    let attempts = Arc::new(AtomicUsize::new(0));

    let alarm = common::always_failing(ActionType::AlarmResponse, "alarm", &attempts);
    assert!(matches!(
        scheduler.try_submit(alarm).await,
        Err(SubmitError::ImmediateFailed {
            action: ActionType::AlarmResponse
        })
    ));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(scheduler.get_stats().failed, 1);

    scheduler.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn events_follow_each_disposition() {
    let scheduler = started(config());
    let mut events = scheduler.subscribe();
    let log = log();

    scheduler
        .submit(recording(ActionType::Heal, "healer", "heal", &log))
        .await;
    wait_until(Duration::from_secs(5), || log.lock().len() == 1).await;

    let queued = events.recv().await.unwrap();
    assert!(matches!(queued, SchedulerEvent::Queued { sequence: 0, .. }));
    match events.recv().await.unwrap() {
        SchedulerEvent::Executed { action, success } => {
            assert!(success);
            assert_eq!(action.action_type, ActionType::Heal);
            assert_eq!(action.source_module, "healer");
        }
        other => panic!("expected an execution event, got {other:?}"),
    }

    let json = serde_json::to_value(scheduler.get_stats()).unwrap();
    assert_eq!(json["executed"], 1);

    scheduler.stop().await.unwrap();
}

#[test]
fn start_outside_a_runtime_fails() {
    let scheduler = ActionScheduler::new(config());
    assert!(matches!(
        scheduler.start(),
        Err(RuntimeError::NoAsyncRuntime(_))
    ));
    assert!(!scheduler.is_running());
}
