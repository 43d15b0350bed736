//! Integration tests for run scheduling
//!
//! Tests cover:
//! - Single-flight runs with overlapping file changes dropped
//! - Overlapping settings/manual triggers, and file changes with retrigger on,
//!   collapsed into one follow-up run
//! - Panicking runs reported as failures
//! - Failed runs reported and followed by healthy ones
//! - Lifecycle events on the event bus

use async_trait::async_trait;
use hb_common::events::{RunState, RunTrigger};
use hb_common::{BoardEvent, EventBus};
use hb_lb::error::PipelineError;
use hb_lb::scheduler::{Reprocess, RunSummary, Scheduler, SchedulerConfig, SchedulerHandle};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Reprocess stub that takes `work` per run and fails the first `failures` runs
struct ScriptedRun {
    calls: AtomicUsize,
    work: Duration,
    failures: usize,
}

#[async_trait]
impl Reprocess for ScriptedRun {
    async fn reprocess(&self, _run_id: Uuid) -> Result<RunSummary, PipelineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.work).await;
        if call < self.failures {
            return Err(PipelineError::SourceUnavailable(PathBuf::from("/missing/events")));
        }
        Ok(RunSummary {
            races: 3,
            pilots: 2,
            rows: 6,
        })
    }
}

fn start(
    work: Duration,
    failures: usize,
    retrigger_on_overlap: bool,
    bus: EventBus,
) -> (Arc<ScriptedRun>, SchedulerHandle) {
    let run = Arc::new(ScriptedRun {
        calls: AtomicUsize::new(0),
        work,
        failures,
    });
    let config = SchedulerConfig {
        debounce: Duration::from_millis(500),
        retrigger_on_overlap,
    };
    let (scheduler, handle) = Scheduler::new(config, Arc::clone(&run), bus);
    scheduler.spawn();
    (run, handle)
}

fn race_changed(race: usize) -> RunTrigger {
    RunTrigger::FileChanged {
        path: PathBuf::from(format!("/data/events/e1/race-{}/Race.json", race)),
    }
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_file_changes_are_dropped() {
    let bus = EventBus::new(32);
    let mut rx = bus.subscribe();
    let (run, handle) = start(Duration::from_secs(1), 0, false, bus);

    handle.notify(RunTrigger::Manual);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.stats().state, RunState::Running);

    // Quiet period ends at 600 ms, while the first run is still going
    handle.notify(race_changed(1));
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert_eq!(run.calls.load(Ordering::SeqCst), 1);
    let stats = handle.stats();
    assert_eq!(stats.triggers_dropped, 1);
    assert_eq!(stats.runs_succeeded, 1);
    assert_eq!(stats.state, RunState::Idle);

    let mut dropped = 0;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, BoardEvent::TriggerDropped { .. }) {
            dropped += 1;
        }
    }
    assert_eq!(dropped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_settings_change_queues_follow_up() {
    let (run, handle) = start(Duration::from_secs(1), 0, false, EventBus::new(32));

    handle.notify(RunTrigger::Startup);
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.notify(RunTrigger::SettingsChanged);
    handle.notify(RunTrigger::Manual);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.stats().state, RunState::RunningQueued);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(run.calls.load(Ordering::SeqCst), 2);
    assert_eq!(handle.stats().triggers_dropped, 0);
    assert_eq!(handle.stats().state, RunState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_retrigger_collapses_file_changes_into_one_follow_up() {
    let (run, handle) = start(Duration::from_secs(1), 0, true, EventBus::new(32));

    handle.notify(RunTrigger::Manual);
    tokio::time::sleep(Duration::from_millis(100)).await;
    for race in 0..3 {
        handle.notify(race_changed(race));
    }
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(handle.stats().state, RunState::RunningQueued);

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(run.calls.load(Ordering::SeqCst), 2);
    assert_eq!(handle.stats().triggers_dropped, 0);
    assert_eq!(handle.stats().state, RunState::Idle);
}

/// Reprocess stub whose first run panics
struct PanickingRun {
    calls: AtomicUsize,
}

#[async_trait]
impl Reprocess for PanickingRun {
    async fn reprocess(&self, _run_id: Uuid) -> Result<RunSummary, PipelineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        if call == 0 {
            panic!("export sink blew up");
        }
        Ok(RunSummary::default())
    }
}

#[tokio::test(start_paused = true)]
async fn test_panicking_run_returns_scheduler_to_idle() {
    let bus = EventBus::new(32);
    let mut rx = bus.subscribe();
    let run = Arc::new(PanickingRun {
        calls: AtomicUsize::new(0),
    });
    let config = SchedulerConfig {
        debounce: Duration::from_millis(500),
        retrigger_on_overlap: false,
    };
    let (scheduler, handle) = Scheduler::new(config, Arc::clone(&run), bus);
    scheduler.spawn();

    handle.notify(RunTrigger::Startup);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let stats = handle.stats();
    assert_eq!(stats.state, RunState::Idle);
    assert_eq!(stats.runs_failed, 1);

    handle.notify(RunTrigger::Manual);
    tokio::time::sleep(Duration::from_secs(1)).await;
    let stats = handle.stats();
    assert_eq!(run.calls.load(Ordering::SeqCst), 2);
    assert_eq!(stats.runs_succeeded, 1);
    assert_eq!(stats.triggers_dropped, 0);

    let failed = std::iter::from_fn(|| rx.try_recv().ok())
        .find_map(|event| match event {
            BoardEvent::RunFailed { message, .. } => Some(message),
            _ => None,
        })
        .expect("Panicking run should be reported");
    assert!(failed.contains("Pipeline worker failed"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_run_is_reported_and_next_run_proceeds() {
    let bus = EventBus::new(32);
    let mut rx = bus.subscribe();
    let (run, handle) = start(Duration::from_millis(50), 1, false, bus);

    handle.notify(RunTrigger::Startup);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(handle.stats().runs_failed, 1);
    assert_eq!(handle.stats().state, RunState::Idle);

    handle.notify(RunTrigger::Manual);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(run.calls.load(Ordering::SeqCst), 2);
    assert_eq!(handle.stats().runs_succeeded, 1);

    let events: Vec<BoardEvent> = std::iter::from_fn(|| rx.try_recv().ok()).collect();
    assert!(matches!(events[0], BoardEvent::RunStarted { .. }));
    match &events[1] {
        BoardEvent::RunFailed { message, .. } => assert!(message.contains("/missing/events")),
        other => panic!("Expected RunFailed, got {:?}", other),
    }
    assert!(matches!(events[2], BoardEvent::RunStarted { .. }));
    match &events[3] {
        BoardEvent::SnapshotPublished { races, pilots, .. } => {
            assert_eq!(*races, 3);
            assert_eq!(*pilots, 2);
        }
        other => panic!("Expected SnapshotPublished, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_file_changes_runs_once() {
    let (run, handle) = start(Duration::from_millis(10), 0, false, EventBus::new(32));

    for race in 0..20 {
        handle.notify(race_changed(race));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(run.calls.load(Ordering::SeqCst), 1);
}
