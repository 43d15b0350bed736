//! Metrics engine
//!
//! Derives, from normalized races:
//! - per-pilot bests for every [`MetricCategory`], over races in the
//!   leaderboard scope
//! - the minimum single-lap ranking over the same races
//! - the flat result table over every valid race, regardless of scope

pub mod category;
pub mod lap_stats;
pub mod pilot_best;
pub mod results;

pub use category::MetricCategory;
pub use lap_stats::{best_window, LapStats, UNSET_LAP_TIME, UNSET_RACE_TIME};
pub use pilot_best::{rank_category, BestEntry, PilotBest, PilotStanding, RankingEntry};
pub use results::{Cell, ResultRow, ResultTable, LAP_SLOTS, ROW_WIDTH};

use crate::normalize::{LeaderboardScope, RaceView};
use serde::Serialize;

/// Entries kept in the minimum-lap ranking
pub const MIN_LAP_RANKING_SIZE: usize = 100;

/// One lap of the minimum-lap ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinLapEntry {
    pub rank: usize,
    pub pilot_id: String,
    pub pilot_name: String,
    pub time: f64,
    pub heat_name: String,
}

/// Everything the metrics engine derives in one run
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// Pilots with bests, in first-seen order
    pub standings: Vec<PilotStanding>,
    pub min_laps: Vec<MinLapEntry>,
    /// Sorted by race start
    pub rows: Vec<ResultRow>,
    /// Valid races inside the scope
    pub scoped_races: usize,
}

/// Run every metric over `races`
///
/// Pilots missing from their event's pilot list contribute nothing.
pub fn aggregate(races: &[RaceView], scope: &LeaderboardScope) -> Aggregation {
    let mut aggregation = Aggregation::default();
    let mut lap_pool: Vec<MinLapEntry> = Vec::new();

    for race in races.iter().filter(|r| r.valid) {
        let in_scope = scope.includes(race);
        if in_scope {
            aggregation.scoped_races += 1;
        }

        for pilot in &race.roster {
            let Some(pilot_name) = pilot.pilot_name.as_deref() else {
                continue;
            };
            let stats = LapStats::compute(&pilot.laps, race.target_laps);

            aggregation.rows.push(ResultRow::from_stats(
                &race.event_name,
                &race.name,
                race.serial,
                pilot_name,
                race.positions.get(&pilot.pilot_id).copied(),
                &stats,
                &pilot.laps,
            ));

            if !in_scope {
                continue;
            }

            let standing = match aggregation
                .standings
                .iter()
                .position(|s| s.pilot_id == pilot.pilot_id)
            {
                Some(index) => &mut aggregation.standings[index],
                None => {
                    aggregation.standings.push(PilotStanding {
                        pilot_id: pilot.pilot_id.clone(),
                        pilot_name: pilot_name.to_string(),
                        bests: PilotBest::default(),
                    });
                    let last = aggregation.standings.len() - 1;
                    &mut aggregation.standings[last]
                }
            };

            for category in MetricCategory::ALL {
                if let Some(time) = category.value(&stats) {
                    standing.bests.offer(
                        category,
                        BestEntry {
                            time,
                            timestamp: race.serial,
                            heat_name: race.name.clone(),
                        },
                    );
                }
            }

            lap_pool.extend(pilot.laps.iter().filter(|lap| lap.number >= 1).map(|lap| {
                MinLapEntry {
                    rank: 0,
                    pilot_id: pilot.pilot_id.clone(),
                    pilot_name: pilot_name.to_string(),
                    time: lap.seconds,
                    heat_name: race.name.clone(),
                }
            }));
        }
    }

    results::sort_rows(&mut aggregation.rows);
    aggregation.min_laps = rank_min_laps(lap_pool);
    aggregation
}

fn rank_min_laps(mut pool: Vec<MinLapEntry>) -> Vec<MinLapEntry> {
    pool.retain(|entry| entry.time.is_finite());
    pool.sort_by(|a, b| a.time.total_cmp(&b.time));
    pool.truncate(MIN_LAP_RANKING_SIZE);
    for (i, entry) in pool.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
    pool
}
