//! Reprocessing scheduler
//!
//! Turns triggers into pipeline runs:
//! - file-change triggers for descriptor files are debounced; each one resets
//!   the quiet period
//! - startup, settings and manual triggers fire immediately
//! - at most one run is in flight; startup, settings and manual triggers that
//!   fire during a run collapse into one follow-up run. File-change triggers
//!   are dropped unless `retrigger_on_overlap` is set
//! - a run that panics is reported as a failed run
//!
//! All state lives in one task driven by a command channel, so the state
//! machine can be exercised without a source tree.

use crate::error::PipelineError;
use crate::source::is_trigger_file;
use async_trait::async_trait;
use hb_common::events::{RunState, RunTrigger};
use hb_common::{BoardEvent, EventBus};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Counts reported by a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Valid races inside the leaderboard scope
    pub races: usize,
    /// Pilots with at least one ranked category
    pub pilots: usize,
    /// Result table rows
    pub rows: usize,
}

/// One full pipeline run
#[async_trait]
pub trait Reprocess: Send + Sync + 'static {
    async fn reprocess(&self, run_id: Uuid) -> Result<RunSummary, PipelineError>;
}

/// Scheduler tuning, fixed for the scheduler's lifetime
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Quiet period for file-change triggers
    pub debounce: Duration,
    pub retrigger_on_overlap: bool,
}

impl SchedulerConfig {
    pub fn from_settings(settings: &hb_common::Settings) -> Self {
        Self {
            debounce: hb_common::time::millis_to_duration(settings.debounce_ms),
            retrigger_on_overlap: settings.retrigger_on_overlap,
        }
    }
}

/// Live counters, readable from any task
#[derive(Debug, Default)]
pub struct SchedulerStatus {
    state: AtomicU8,
    runs_started: AtomicU64,
    runs_succeeded: AtomicU64,
    runs_failed: AtomicU64,
    triggers_dropped: AtomicU64,
}

/// Point-in-time copy of [`SchedulerStatus`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStats {
    pub state: RunState,
    pub runs_started: u64,
    pub runs_succeeded: u64,
    pub runs_failed: u64,
    pub triggers_dropped: u64,
}

impl SchedulerStatus {
    fn set_state(&self, state: RunState) {
        let encoded = match state {
            RunState::Idle => 0,
            RunState::Running => 1,
            RunState::RunningQueued => 2,
        };
        self.state.store(encoded, Ordering::SeqCst);
    }

    pub fn state(&self) -> RunState {
        match self.state.load(Ordering::SeqCst) {
            1 => RunState::Running,
            2 => RunState::RunningQueued,
            _ => RunState::Idle,
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            state: self.state(),
            runs_started: self.runs_started.load(Ordering::SeqCst),
            runs_succeeded: self.runs_succeeded.load(Ordering::SeqCst),
            runs_failed: self.runs_failed.load(Ordering::SeqCst),
            triggers_dropped: self.triggers_dropped.load(Ordering::SeqCst),
        }
    }
}

/// Cloneable sender side of the scheduler
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::UnboundedSender<RunTrigger>,
    status: Arc<SchedulerStatus>,
}

impl SchedulerHandle {
    /// Queue a trigger; returns false once the scheduler has stopped
    pub fn notify(&self, trigger: RunTrigger) -> bool {
        self.tx.send(trigger).is_ok()
    }

    pub fn stats(&self) -> SchedulerStats {
        self.status.stats()
    }
}

struct RunOutcome {
    run_id: Uuid,
    started: Instant,
    result: Result<RunSummary, PipelineError>,
}

/// The scheduler task state
pub struct Scheduler<R: Reprocess> {
    config: SchedulerConfig,
    reprocess: Arc<R>,
    bus: EventBus,
    status: Arc<SchedulerStatus>,
    commands: mpsc::UnboundedReceiver<RunTrigger>,
    done_tx: mpsc::UnboundedSender<RunOutcome>,
    done_rx: mpsc::UnboundedReceiver<RunOutcome>,
    state: RunState,
    /// Trigger to start when the current run finishes
    queued: Option<RunTrigger>,
    /// Latest debounced trigger and when it fires
    debounced: Option<(RunTrigger, Instant)>,
}

impl<R: Reprocess> Scheduler<R> {
    pub fn new(config: SchedulerConfig, reprocess: Arc<R>, bus: EventBus) -> (Self, SchedulerHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        let status = Arc::new(SchedulerStatus::default());

        let scheduler = Self {
            config,
            reprocess,
            bus,
            status: Arc::clone(&status),
            commands,
            done_tx,
            done_rx,
            state: RunState::Idle,
            queued: None,
            debounced: None,
        };
        (scheduler, SchedulerHandle { tx, status })
    }

    /// Spawn the scheduler loop on the current runtime
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Drive the state machine until every handle is dropped
    pub async fn run(mut self) {
        info!(
            "Scheduler started (debounce {:?}, retrigger on overlap: {})",
            self.config.debounce, self.config.retrigger_on_overlap
        );

        loop {
            let deadline = self.debounced.as_ref().map(|(_, at)| *at);

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(trigger) => self.on_trigger(trigger),
                    None => break,
                },
                Some(outcome) = self.done_rx.recv() => self.on_run_finished(outcome),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    if let Some((trigger, _)) = self.debounced.take() {
                        debug!("Quiet period elapsed");
                        self.fire(trigger);
                    }
                }
            }
        }

        info!("Scheduler stopped");
    }

    fn on_trigger(&mut self, trigger: RunTrigger) {
        if let RunTrigger::FileChanged { path } = &trigger {
            if !is_trigger_file(path) {
                debug!("Ignoring change to {}", path.display());
                return;
            }
        }

        if trigger.is_debounced() {
            debug!("Debouncing {}", trigger);
            self.debounced = Some((trigger, Instant::now() + self.config.debounce));
        } else {
            self.fire(trigger);
        }
    }

    fn fire(&mut self, trigger: RunTrigger) {
        match self.state {
            RunState::Idle => self.start_run(trigger),
            RunState::Running if self.config.retrigger_on_overlap || !trigger.is_debounced() => {
                info!("Run in progress; queued follow-up run for {}", trigger);
                self.queued = Some(trigger);
                self.set_state(RunState::RunningQueued);
            }
            RunState::RunningQueued => {
                debug!("Follow-up run already queued; folding in {}", trigger);
                self.queued = Some(trigger);
            }
            RunState::Running => {
                warn!("Run in progress; dropping trigger: {}", trigger);
                self.status.triggers_dropped.fetch_add(1, Ordering::SeqCst);
                self.bus.emit(BoardEvent::TriggerDropped {
                    trigger,
                    timestamp: hb_common::time::now(),
                });
            }
        }
    }

    fn start_run(&mut self, trigger: RunTrigger) {
        let run_id = Uuid::new_v4();
        info!("Starting run {} ({})", run_id, trigger);

        self.set_state(RunState::Running);
        self.status.runs_started.fetch_add(1, Ordering::SeqCst);
        self.bus.emit(BoardEvent::RunStarted {
            run_id,
            trigger,
            timestamp: hb_common::time::now(),
        });

        let reprocess = Arc::clone(&self.reprocess);
        let done_tx = self.done_tx.clone();
        let started = Instant::now();
        tokio::spawn(async move {
            // Inner task so a panicking run still reports back
            let result = match tokio::spawn(async move { reprocess.reprocess(run_id).await }).await {
                Ok(result) => result,
                Err(e) => Err(PipelineError::Worker(e.to_string())),
            };
            // The scheduler owns a sender, so the receiver outlives every run
            let _ = done_tx.send(RunOutcome {
                run_id,
                started,
                result,
            });
        });
    }

    fn on_run_finished(&mut self, outcome: RunOutcome) {
        let duration_ms = outcome.started.elapsed().as_millis() as u64;
        match outcome.result {
            Ok(summary) => {
                info!(
                    "Run {} published: {} races, {} pilots, {} rows in {} ms",
                    outcome.run_id, summary.races, summary.pilots, summary.rows, duration_ms
                );
                self.status.runs_succeeded.fetch_add(1, Ordering::SeqCst);
                self.bus.emit(BoardEvent::SnapshotPublished {
                    run_id: outcome.run_id,
                    races: summary.races,
                    pilots: summary.pilots,
                    duration_ms,
                    timestamp: hb_common::time::now(),
                });
            }
            Err(e) => {
                error!(
                    "Run {} failed after {} ms, keeping previous snapshot: {}",
                    outcome.run_id, duration_ms, e
                );
                self.status.runs_failed.fetch_add(1, Ordering::SeqCst);
                self.bus.emit(BoardEvent::RunFailed {
                    run_id: outcome.run_id,
                    message: e.to_string(),
                    timestamp: hb_common::time::now(),
                });
            }
        }

        self.set_state(RunState::Idle);
        if let Some(trigger) = self.queued.take() {
            self.start_run(trigger);
        }
    }

    fn set_state(&mut self, state: RunState) {
        self.state = state;
        self.status.set_state(state);
    }
}
