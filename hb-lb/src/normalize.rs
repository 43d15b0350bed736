//! Race normalizer
//!
//! Joins the raw records of every selected event into [`RaceView`]s: one per
//! race descriptor, ordered by round number then race number, with each
//! pilot's valid laps sorted by lap number. Both valid and invalid races are
//! kept because the heat locator scans the full schedule; aggregation uses
//! [`RaceView::valid`] to filter.

use crate::source::{LoadedEvent, PilotChannelRecord, PilotRecord, SourceTree};
use chrono::NaiveDateTime;
use hb_common::time::{parse_timing_timestamp, to_serial_days};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Selector value for every round of every selected event
pub const ALL_ROUNDS: &str = "all";

/// Event types with a dedicated `all<Type>` selector
pub const KNOWN_EVENT_TYPES: [&str; 4] = ["Race", "Practice", "TimeTrial", "Endurance"];

/// Which races feed the leaderboard categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum LeaderboardScope {
    All,
    /// Every race whose round has this event type
    EventType(String),
    /// Races of a single round id
    Round(String),
}

impl LeaderboardScope {
    /// Parse the `leaderboard_round` setting
    pub fn parse(value: &str) -> Self {
        if value == ALL_ROUNDS {
            return LeaderboardScope::All;
        }
        if let Some(event_type) = value.strip_prefix("all") {
            if KNOWN_EVENT_TYPES.contains(&event_type) {
                return LeaderboardScope::EventType(event_type.to_string());
            }
        }
        LeaderboardScope::Round(value.to_string())
    }

    pub fn includes(&self, race: &RaceView) -> bool {
        match self {
            LeaderboardScope::All => true,
            LeaderboardScope::EventType(t) => race.event_type == *t,
            LeaderboardScope::Round(id) => race.round_id == *id,
        }
    }
}

impl fmt::Display for LeaderboardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeaderboardScope::All => write!(f, "{}", ALL_ROUNDS),
            LeaderboardScope::EventType(t) => write!(f, "all{}", t),
            LeaderboardScope::Round(id) => write!(f, "{}", id),
        }
    }
}

/// One lap attributed to a pilot through a valid detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lap {
    /// 0 is the holeshot
    pub number: i32,
    pub seconds: f64,
}

/// A pilot's laps in one race, ascending by lap number
#[derive(Debug, Clone, PartialEq)]
pub struct PilotLaps {
    pub pilot_id: String,
    /// `None` when the pilot is missing from the event's pilot list
    pub pilot_name: Option<String>,
    pub laps: Vec<Lap>,
}

/// Normalized race
#[derive(Debug, Clone)]
pub struct RaceView {
    pub race_id: String,
    pub event_name: String,
    /// Target lap count of the owning event
    pub target_laps: u32,
    pub round_id: String,
    /// 0 when the round is unknown
    pub round_number: i32,
    pub event_type: String,
    pub race_number: i32,
    pub valid: bool,
    /// `"{EventType} {RoundNumber|N/A}-{RaceNumber}"`
    pub name: String,
    /// Start time of the lowest-numbered lap, as recorded
    pub start: Option<NaiveDateTime>,
    /// `start` as spreadsheet serial days
    pub serial: Option<f64>,
    /// Laps recorded in the descriptor, attributable or not
    pub recorded_laps: usize,
    /// Distinct detection pilots in first-reference order, each with their
    /// valid laps
    pub roster: Vec<PilotLaps>,
    pub pilot_channels: Vec<PilotChannelRecord>,
    /// Finishing position per pilot id, when the race has results
    pub positions: HashMap<String, i32>,
}

impl RaceView {
    pub fn has_started(&self) -> bool {
        self.recorded_laps > 0
    }

    pub fn pilot_ids(&self) -> impl Iterator<Item = &str> {
        self.roster.iter().map(|p| p.pilot_id.as_str())
    }
}

/// Display name of a race
pub fn race_name(event_type: &str, round_number: i32, race_number: i32) -> String {
    if round_number == 0 {
        format!("{} N/A-{}", event_type, race_number)
    } else {
        format!("{} {}-{}", event_type, round_number, race_number)
    }
}

/// Every race of the selected events, ordered by round then race number
pub fn normalize(tree: &SourceTree) -> Vec<RaceView> {
    let mut races: Vec<RaceView> = tree
        .events
        .iter()
        .flat_map(normalize_event)
        .collect();

    // Stable: equal keys keep directory order
    races.sort_by_key(|r| (r.round_number, r.race_number));
    races
}

fn normalize_event(event: &LoadedEvent) -> Vec<RaceView> {
    event
        .races
        .iter()
        .map(|loaded| {
            let race = &loaded.race;
            let round = event.rounds.iter().find(|r| r.id == race.round);
            let round_number = round.map(|r| r.round_number).unwrap_or(0);
            let event_type = round
                .map(|r| r.event_type.clone())
                .unwrap_or_else(|| "Race".to_string());

            let start = race
                .laps
                .iter()
                .min_by_key(|lap| lap.lap_number)
                .and_then(|lap| lap.start_time.as_deref())
                .and_then(parse_timing_timestamp);

            let valid_detections: HashMap<&str, &str> = race
                .detections
                .iter()
                .filter(|d| d.valid)
                .map(|d| (d.id.as_str(), d.pilot.as_str()))
                .collect();

            let mut roster: Vec<PilotLaps> = Vec::new();
            for detection in &race.detections {
                if !roster.iter().any(|p| p.pilot_id == detection.pilot) {
                    let pilot_name = event
                        .pilots
                        .iter()
                        .find(|p| p.id == detection.pilot)
                        .map(|p| p.name.clone());
                    roster.push(PilotLaps {
                        pilot_id: detection.pilot.clone(),
                        pilot_name,
                        laps: Vec::new(),
                    });
                }
            }

            for lap in &race.laps {
                let Some(pilot_id) = valid_detections.get(lap.detection.as_str()) else {
                    continue;
                };
                if let Some(entry) = roster.iter_mut().find(|p| p.pilot_id == *pilot_id) {
                    entry.laps.push(Lap {
                        number: lap.lap_number,
                        seconds: lap.length_seconds,
                    });
                }
            }
            for entry in &mut roster {
                entry.laps.sort_by_key(|lap| lap.number);
            }

            let positions = loaded
                .results
                .iter()
                .flatten()
                .filter_map(|r| r.position.map(|p| (r.pilot.clone(), p)))
                .collect();

            RaceView {
                race_id: race.id.clone(),
                event_name: event.event.name.clone(),
                target_laps: event.event.laps,
                round_id: race.round.clone(),
                round_number,
                name: race_name(&event_type, round_number, race.race_number),
                event_type,
                race_number: race.race_number,
                valid: race.valid,
                start,
                serial: start.map(to_serial_days),
                recorded_laps: race.laps.len(),
                roster,
                pilot_channels: race.pilot_channels.clone(),
                positions,
            }
        })
        .collect()
}

/// Pilot directory of the selected events; later events win on id clashes
pub fn pilot_directory(tree: &SourceTree) -> HashMap<String, PilotRecord> {
    tree.events
        .iter()
        .flat_map(|e| e.pilots.iter())
        .map(|p| (p.id.clone(), p.clone()))
        .collect()
}
