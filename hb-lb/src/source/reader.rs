//! Source tree reader
//!
//! Loads one run's worth of raw records from the events directory:
//!
//! ```text
//! <source_root>/events/<event_id>/Event.json
//!                                 Pilots.json
//!                                 Rounds.json
//!                                 <race_dir>/Race.json
//!                                 <race_dir>/Result.json   (optional)
//! <source_root>/httpfiles/Channels.json                    (optional)
//! ```
//!
//! Directories are visited in file-name order so two runs over the same tree
//! see records in the same order.

use super::records::{
    ChannelRecord, EventRecord, PilotRecord, RaceRecord, ResultRecord, RoundRecord,
};
use crate::error::PipelineError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const EVENT_FILE: &str = "Event.json";
pub const PILOTS_FILE: &str = "Pilots.json";
pub const ROUNDS_FILE: &str = "Rounds.json";
pub const RACE_FILE: &str = "Race.json";
pub const RESULT_FILE: &str = "Result.json";

/// Event selector value meaning "every event directory"
pub const ALL_EVENTS: &str = "all";

/// Event id and name, for selectors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventSummary {
    pub id: String,
    pub name: String,
}

/// One race directory
#[derive(Debug, Clone)]
pub struct LoadedRace {
    pub race: RaceRecord,
    /// `None` when the race has no `Result.json`
    pub results: Option<Vec<ResultRecord>>,
}

/// One fully loaded event directory
#[derive(Debug, Clone)]
pub struct LoadedEvent {
    /// Directory name (the event id used by the selector)
    pub dir_id: String,
    pub event: EventRecord,
    pub pilots: Vec<PilotRecord>,
    pub rounds: Vec<RoundRecord>,
    pub races: Vec<LoadedRace>,
}

/// Everything one run reads from disk
#[derive(Debug, Clone, Default)]
pub struct SourceTree {
    /// Selected events, fully loaded
    pub events: Vec<LoadedEvent>,
    /// Every event directory with a readable `Event.json`
    pub event_directory: Vec<EventSummary>,
    /// Channel id to display label
    pub channels: HashMap<String, String>,
}

/// Load the selected events plus the event directory and channel map
pub fn load_source_tree(
    events_dir: &Path,
    channels_path: &Path,
    selected_event_id: &str,
) -> Result<SourceTree, PipelineError> {
    if !events_dir.is_dir() {
        return Err(PipelineError::SourceUnavailable(events_dir.to_path_buf()));
    }

    let channels = load_channels(channels_path)?;
    let event_dirs = list_subdirectories(events_dir);

    let mut event_directory = Vec::new();
    for (dir_id, dir) in &event_dirs {
        let path = dir.join(EVENT_FILE);
        if !path.is_file() {
            continue;
        }
        match read_json_array::<EventRecord>(&path) {
            Ok(records) => {
                if let Some(event) = records.into_iter().next() {
                    event_directory.push(EventSummary {
                        id: dir_id.clone(),
                        name: event.name,
                    });
                }
            }
            // Only the selected events abort the run on bad data
            Err(e) => debug!("Event directory listing skipped {}: {}", dir_id, e),
        }
    }

    let select_all = selected_event_id == ALL_EVENTS;
    if !select_all && !event_dirs.iter().any(|(id, _)| id == selected_event_id) {
        return Err(PipelineError::SourceUnavailable(
            events_dir.join(selected_event_id),
        ));
    }

    let mut events = Vec::new();
    for (dir_id, dir) in event_dirs {
        if !select_all && dir_id != selected_event_id {
            continue;
        }

        let missing: Vec<PathBuf> = [EVENT_FILE, PILOTS_FILE, ROUNDS_FILE]
            .iter()
            .map(|name| dir.join(name))
            .filter(|path| !path.is_file())
            .collect();
        if let Some(first_missing) = missing.into_iter().next() {
            if select_all {
                warn!(
                    "Skipping event directory {}: missing {}",
                    dir_id,
                    first_missing.display()
                );
                continue;
            }
            return Err(PipelineError::SourceUnavailable(first_missing));
        }

        if let Some(event) = load_event(&dir_id, &dir)? {
            events.push(event);
        }
    }

    Ok(SourceTree {
        events,
        event_directory,
        channels,
    })
}

fn load_event(dir_id: &str, dir: &Path) -> Result<Option<LoadedEvent>, PipelineError> {
    let event_path = dir.join(EVENT_FILE);
    let Some(event) = read_json_array::<EventRecord>(&event_path)?
        .into_iter()
        .next()
    else {
        warn!("Skipping event {}: {} is empty", dir_id, event_path.display());
        return Ok(None);
    };

    let pilots = read_json_array::<PilotRecord>(&dir.join(PILOTS_FILE))?;
    let rounds = read_json_array::<RoundRecord>(&dir.join(ROUNDS_FILE))?;

    let mut races = Vec::new();
    for (race_dir_name, race_dir) in list_subdirectories(dir) {
        let race_path = race_dir.join(RACE_FILE);
        if !race_path.is_file() {
            debug!("Race directory {} has no {}", race_dir_name, RACE_FILE);
            continue;
        }

        let Some(race) = read_json_array::<RaceRecord>(&race_path)?
            .into_iter()
            .next()
        else {
            warn!("Skipping race: {} is empty", race_path.display());
            continue;
        };

        let result_path = race_dir.join(RESULT_FILE);
        let results = if result_path.is_file() {
            Some(read_json_array::<ResultRecord>(&result_path)?)
        } else {
            None
        };

        races.push(LoadedRace { race, results });
    }

    debug!(
        "Loaded event {} ({}): {} pilots, {} rounds, {} races",
        dir_id,
        event.name,
        pilots.len(),
        rounds.len(),
        races.len()
    );

    Ok(Some(LoadedEvent {
        dir_id: dir_id.to_string(),
        event,
        pilots,
        rounds,
        races,
    }))
}

fn load_channels(path: &Path) -> Result<HashMap<String, String>, PipelineError> {
    if !path.is_file() {
        warn!(
            "Channel directory {} not found; band labels will be unavailable",
            path.display()
        );
        return Ok(HashMap::new());
    }

    Ok(read_json_array::<ChannelRecord>(path)?
        .into_iter()
        .map(|c| (c.id, c.display_name))
        .collect())
}

/// Immediate subdirectories as (name, path), sorted by name
fn list_subdirectories(dir: &Path) -> Vec<(String, PathBuf)> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter();

    let mut subdirs = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => {
                let name = entry.file_name().to_string_lossy().into_owned();
                subdirs.push((name, entry.into_path()));
            }
            Ok(_) => {}
            Err(e) => warn!("Could not access entry under {}: {}", dir.display(), e),
        }
    }
    subdirs
}

/// Read a top-level JSON array of records
fn read_json_array<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PipelineError> {
    let content = std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // Exports written by Windows tools may start with a byte order mark
    let content = content.trim_start_matches('\u{feff}');

    serde_json::from_str(content).map_err(|source| PipelineError::MalformedRecord {
        path: path.to_path_buf(),
        source,
    })
}
