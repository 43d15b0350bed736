//! Polling change source
//!
//! Walks the events directory on an interval and reports every file whose
//! modification time or size changed, appeared, or disappeared since the
//! previous scan. Filtering to descriptor files happens in the scheduler.

use crate::scheduler::SchedulerHandle;
use hb_common::events::RunTrigger;
use hb_common::SettingsStore;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Modification time and size of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

/// Stamps of every file under a root
pub type Scan = HashMap<PathBuf, FileStamp>;

/// Stamp every file under `root`; a missing root scans as empty
pub fn scan(root: &Path) -> Scan {
    let mut files = Scan::new();
    if !root.is_dir() {
        return files;
    }

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Watcher skipped entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match entry.metadata() {
            Ok(meta) => {
                files.insert(
                    entry.into_path(),
                    FileStamp {
                        modified: meta.modified().ok(),
                        len: meta.len(),
                    },
                );
            }
            Err(e) => debug!("Watcher could not stat {}: {}", entry.path().display(), e),
        }
    }
    files
}

/// Paths added, removed or changed between two scans, sorted
pub fn diff(previous: &Scan, current: &Scan) -> Vec<PathBuf> {
    let mut changed: Vec<PathBuf> = current
        .iter()
        .filter(|(path, stamp)| previous.get(*path) != Some(*stamp))
        .map(|(path, _)| path.clone())
        .chain(
            previous
                .keys()
                .filter(|path| !current.contains_key(*path))
                .cloned(),
        )
        .collect();
    changed.sort();
    changed
}

/// Interval-driven watcher feeding the scheduler
pub struct PollingWatcher {
    settings: SettingsStore,
    scheduler: SchedulerHandle,
}

impl PollingWatcher {
    pub fn new(settings: SettingsStore, scheduler: SchedulerHandle) -> Self {
        Self {
            settings,
            scheduler,
        }
    }

    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Poll until the scheduler stops
    ///
    /// The events directory and interval are re-read from the settings on
    /// every tick. A new root starts a fresh baseline without notifications;
    /// the settings change already triggers its own run.
    pub async fn run(self) {
        let initial = self.settings.snapshot().await;
        let mut root = initial.events_dir();
        let mut period = poll_period(initial.poll_interval_ms);
        let mut previous = scan_blocking(root.clone()).await;
        info!("Watching {} every {:?}", root.display(), period);

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let settings = self.settings.snapshot().await;
            let configured = poll_period(settings.poll_interval_ms);
            if configured != period {
                period = configured;
                ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                ticker.tick().await;
            }

            let events_dir = settings.events_dir();
            if events_dir != root {
                info!("Watch root changed to {}", events_dir.display());
                root = events_dir;
                previous = scan_blocking(root.clone()).await;
                continue;
            }

            let current = scan_blocking(root.clone()).await;
            for path in diff(&previous, &current) {
                debug!("Changed: {}", path.display());
                if !self.scheduler.notify(RunTrigger::FileChanged { path }) {
                    info!("Scheduler stopped; watcher exiting");
                    return;
                }
            }
            previous = current;
        }
    }
}

/// `interval` rejects a zero period
fn poll_period(millis: u64) -> std::time::Duration {
    hb_common::time::millis_to_duration(millis.max(1))
}

async fn scan_blocking(root: PathBuf) -> Scan {
    match tokio::task::spawn_blocking(move || scan(&root)).await {
        Ok(files) => files,
        Err(e) => {
            warn!("Watcher scan task failed: {}", e);
            Scan::new()
        }
    }
}
