//! Timing-system export loading
//!
//! - `records`: serde shapes of the export's JSON files
//! - `reader`: walks the events directory and loads one run's records

pub mod reader;
pub mod records;

pub use reader::{
    load_source_tree, EventSummary, LoadedEvent, LoadedRace, SourceTree, ALL_EVENTS,
    EVENT_FILE, PILOTS_FILE, RACE_FILE, RESULT_FILE, ROUNDS_FILE,
};
pub use records::{
    DetectionRecord, EventRecord, LapRecord, PilotChannelRecord, PilotRecord, RaceRecord,
    ResultRecord, RoundRecord, DEFAULT_TARGET_LAPS,
};

/// File names whose change should trigger a reprocessing run
pub const TRIGGER_FILES: [&str; 5] = [EVENT_FILE, PILOTS_FILE, ROUNDS_FILE, RACE_FILE, RESULT_FILE];

/// Whether a changed path is one of the descriptors a run reads
pub fn is_trigger_file(path: &std::path::Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| TRIGGER_FILES.iter().any(|t| name.ends_with(t)))
        .unwrap_or(false)
}
