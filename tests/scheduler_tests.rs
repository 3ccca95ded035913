//! Scheduling engine behavior through the public surface.

mod support;

use std::sync::Arc;
use std::time::Duration;

use bidwatch::domain::ExecutionStatus;
use bidwatch::error::{Error, SchedulerError};
use bidwatch::port::SearchPage;
use bidwatch::testkit::{listing, search, HangingClient, MemoryStore, ScriptedClient};
use rust_decimal_macros::dec;

async fn settle() {
    tokio::time::sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn manual_trigger_executes_and_audits() {
    let store = Arc::new(MemoryStore::new());
    let saved = store.add_search(search(0, "vintage camera"));

    let client = ScriptedClient::new().with_results(vec![Ok(SearchPage {
        listings: vec![listing("ext-1", "Vintage Camera", dec!(19.99))],
        total: 1,
    })]);
    let (scheduler, signal, _shutdown) =
        support::scheduler(store.clone(), client, support::fast_scheduler_config());

    let engine = tokio::spawn(scheduler.clone().run());
    scheduler.trigger_search(saved.id).await.unwrap();
    settle().await;

    assert_eq!(store.item_count(), 1);
    let executions = store.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, ExecutionStatus::Completed);
    assert_eq!(executions[0].items_found, 1);
    assert_eq!(executions[0].new_items_found, 1);
    assert!(!scheduler.is_active(saved.id));

    signal.trigger();
    let _ = engine.await;
}

#[tokio::test]
async fn trigger_unknown_search_fails_typed() {
    let store = Arc::new(MemoryStore::new());
    let (scheduler, _signal, _shutdown) =
        support::scheduler(store, ScriptedClient::new(), support::fast_scheduler_config());

    let err = scheduler.trigger_search(999).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Scheduler(SchedulerError::SearchNotFound { id: 999 })
    ));
}

#[tokio::test]
async fn trigger_disabled_search_rejected() {
    let store = Arc::new(MemoryStore::new());
    let mut disabled = search(0, "old radios");
    disabled.enabled = false;
    let saved = store.add_search(disabled);

    let (scheduler, _signal, _shutdown) =
        support::scheduler(store, ScriptedClient::new(), support::fast_scheduler_config());

    let err = scheduler.trigger_search(saved.id).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Scheduler(SchedulerError::SearchDisabled { .. })
    ));
}

#[tokio::test]
async fn executing_search_rejects_second_trigger() {
    let store = Arc::new(MemoryStore::new());
    let saved = store.add_search(search(0, "slow search"));

    let (scheduler, signal, _shutdown) = support::scheduler(
        store,
        HangingClient::new(),
        support::fast_scheduler_config(),
    );

    let engine = tokio::spawn(scheduler.clone().run());
    scheduler.trigger_search(saved.id).await.unwrap();
    settle().await;
    assert!(scheduler.is_active(saved.id));

    let err = scheduler.trigger_search(saved.id).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Scheduler(SchedulerError::SearchAlreadyActive { .. })
    ));

    signal.trigger();
    let _ = engine.await;
}

#[tokio::test]
async fn full_queue_rejects_trigger() {
    let store = Arc::new(MemoryStore::new());
    let saved = store.add_search(search(0, "queued"));

    let mut config = support::fast_scheduler_config();
    config.queue_size = 1;
    // Workers never started, so the queue cannot drain.
    let (scheduler, _signal, _shutdown) = support::scheduler(store, ScriptedClient::new(), config);

    scheduler.trigger_search(saved.id).await.unwrap();
    let err = scheduler.trigger_search(saved.id).await.unwrap_err();
    assert!(matches!(err, Error::Scheduler(SchedulerError::QueueFull)));
}

#[tokio::test]
async fn periodic_cycle_caps_pending_timers() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..20 {
        store.add_search(search(0, &format!("query-{i}")));
    }

    let mut config = support::fast_scheduler_config();
    config.max_pending_timers = 5;
    // Long delay keeps every armed timer pending for the assertion window.
    config.base_delay_secs = 60;
    let (scheduler, _signal, _shutdown) = support::scheduler(store, ScriptedClient::new(), config);

    scheduler.run_cycle().await;
    assert!(scheduler.pending_timer_count() <= 5);
}

#[tokio::test]
async fn failed_execution_records_failure_and_schedules_retry() {
    let store = Arc::new(MemoryStore::new());
    let saved = store.add_search(search(0, "flaky"));

    let client = ScriptedClient::new().with_results(vec![Err(Error::Status { status: 500 })]);
    let mut config = support::fast_scheduler_config();
    config.requeue_delay_secs = 60;
    let (scheduler, signal, _shutdown) = support::scheduler(store.clone(), client, config);

    let engine = tokio::spawn(scheduler.clone().run());
    scheduler.trigger_search(saved.id).await.unwrap();
    settle().await;

    let executions = store.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, ExecutionStatus::Failed);
    assert!(executions[0].error.as_deref().unwrap().contains("500"));
    // The retry re-enqueue sits in the timer arena, outside the cycle.
    assert_eq!(scheduler.pending_timer_count(), 1);

    signal.trigger();
    let _ = engine.await;
}
