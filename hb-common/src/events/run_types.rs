//! Reprocessing run types shared by the scheduler and event consumers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Why a pipeline run was requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunTrigger {
    /// Process start
    Startup,
    /// A source file changed (debounced before it fires)
    FileChanged { path: PathBuf },
    /// Settings were updated through the API
    SettingsChanged,
    /// Explicit request through the API
    Manual,
}

impl RunTrigger {
    /// Whether this trigger waits for the quiet period before firing
    pub fn is_debounced(&self) -> bool {
        matches!(self, RunTrigger::FileChanged { .. })
    }
}

impl fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunTrigger::Startup => write!(f, "startup"),
            RunTrigger::FileChanged { path } => write!(f, "file change ({})", path.display()),
            RunTrigger::SettingsChanged => write!(f, "settings change"),
            RunTrigger::Manual => write!(f, "manual request"),
        }
    }
}

/// Scheduler run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// No run in flight
    Idle,
    /// A run is executing
    Running,
    /// A run is executing and one follow-up run is pending
    RunningQueued,
}
