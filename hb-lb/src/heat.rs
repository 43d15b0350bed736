//! Heat locator
//!
//! Finds the most recently run heat and the next heat on the schedule.

use crate::metrics::RankingEntry;
use crate::normalize::RaceView;
use crate::source::PilotRecord;
use serde::Serialize;
use std::collections::HashMap;

/// Band label when a channel is not in the channel directory
pub const UNKNOWN_BAND: &str = "N/A";

/// Name shown when an assigned pilot is not in the pilot list
pub const UNKNOWN_PILOT: &str = "Unknown Pilot";

/// The most recently completed heat
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestHeat {
    pub race_id: String,
    pub name: String,
    /// Distinct detection pilots
    pub pilot_ids: Vec<String>,
}

/// A pilot lined up for the next heat
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextHeatPilot {
    pub pilot_id: String,
    pub pilot_name: String,
    pub photopath: Option<String>,
    pub band: String,
    /// Current position in the configured ranking
    pub rank: Option<usize>,
    pub time: Option<f64>,
}

/// The next heat to be run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextHeat {
    pub race_id: String,
    pub name: String,
    pub pilots: Vec<NextHeatPilot>,
}

/// Index of the valid, started race with the latest start
///
/// Races without a start time rank oldest; equal starts keep the earliest
/// race in schedule order.
pub fn latest_heat_index(races: &[RaceView]) -> Option<usize> {
    let mut latest: Option<usize> = None;
    for (index, race) in races.iter().enumerate() {
        if !race.valid || !race.has_started() {
            continue;
        }
        match latest {
            Some(current) if race.start <= races[current].start => {}
            _ => latest = Some(index),
        }
    }
    latest
}

/// Index of the first valid, not yet started race after `after`
pub fn next_heat_index(races: &[RaceView], after: Option<usize>) -> Option<usize> {
    let start = after.map(|i| i + 1).unwrap_or(0);
    races
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, race)| race.valid && !race.has_started())
        .map(|(index, _)| index)
}

/// Locate the latest and next heats
///
/// `ranking` is the configured category's ranking, used to annotate the next
/// heat's pilots.
pub fn locate_heats(
    races: &[RaceView],
    pilots: &HashMap<String, PilotRecord>,
    channels: &HashMap<String, String>,
    ranking: &[RankingEntry],
) -> (Option<LatestHeat>, Option<NextHeat>) {
    let latest_index = latest_heat_index(races);
    let latest = latest_index.map(|i| {
        let race = &races[i];
        LatestHeat {
            race_id: race.race_id.clone(),
            name: race.name.clone(),
            pilot_ids: race.pilot_ids().map(str::to_string).collect(),
        }
    });

    let next = next_heat_index(races, latest_index).map(|i| {
        let race = &races[i];
        let lineup = race
            .pilot_channels
            .iter()
            .map(|assignment| {
                let pilot = pilots.get(&assignment.pilot);
                let ranked = ranking.iter().find(|r| r.pilot_id == assignment.pilot);
                NextHeatPilot {
                    pilot_id: assignment.pilot.clone(),
                    pilot_name: pilot
                        .map(|p| p.name.clone())
                        .unwrap_or_else(|| UNKNOWN_PILOT.to_string()),
                    photopath: pilot.and_then(|p| p.photo_path.clone()),
                    band: channels
                        .get(&assignment.channel)
                        .cloned()
                        .unwrap_or_else(|| UNKNOWN_BAND.to_string()),
                    rank: ranked.map(|r| r.rank),
                    time: ranked.map(|r| r.time),
                }
            })
            .collect();
        NextHeat {
            race_id: race.race_id.clone(),
            name: race.name.clone(),
            pilots: lineup,
        }
    });

    (latest, next)
}
