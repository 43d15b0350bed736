//! Running per-pilot bests and category rankings

use super::category::MetricCategory;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Best value of one category with the race it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestEntry {
    pub time: f64,
    /// Race start as spreadsheet serial days
    pub timestamp: Option<f64>,
    pub heat_name: String,
}

impl BestEntry {
    /// Ranking order: time, then timestamp with a missing one last
    pub fn cmp_rank(&self, other: &BestEntry) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| compare_timestamps(self.timestamp, other.timestamp))
    }
}

fn compare_timestamps(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// One pilot's best entry per category; absent categories are unset
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PilotBest {
    categories: BTreeMap<MetricCategory, BestEntry>,
}

impl PilotBest {
    /// Offer a candidate; it replaces the current entry only if strictly better
    ///
    /// Non-finite times are never accepted. Returns whether the entry changed.
    pub fn offer(&mut self, category: MetricCategory, candidate: BestEntry) -> bool {
        if !candidate.time.is_finite() {
            return false;
        }
        match self.categories.get(&category) {
            Some(current) if candidate.cmp_rank(current) != Ordering::Less => false,
            _ => {
                self.categories.insert(category, candidate);
                true
            }
        }
    }

    pub fn get(&self, category: MetricCategory) -> Option<&BestEntry> {
        self.categories.get(&category)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// A pilot with their bests, in first-seen order within the run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotStanding {
    pub pilot_id: String,
    pub pilot_name: String,
    pub bests: PilotBest,
}

/// One ranked line of a category
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    /// 1-based
    pub rank: usize,
    pub pilot_id: String,
    pub pilot_name: String,
    pub time: f64,
    pub timestamp: Option<f64>,
    pub heat_name: String,
}

/// Rank every pilot whose `category` is populated
///
/// Sorting is stable, so fully tied pilots keep first-seen order.
pub fn rank_category(standings: &[PilotStanding], category: MetricCategory) -> Vec<RankingEntry> {
    let mut populated: Vec<(&PilotStanding, &BestEntry)> = standings
        .iter()
        .filter_map(|s| s.bests.get(category).map(|entry| (s, entry)))
        .collect();
    populated.sort_by(|a, b| a.1.cmp_rank(b.1));

    populated
        .into_iter()
        .enumerate()
        .map(|(i, (standing, entry))| RankingEntry {
            rank: i + 1,
            pilot_id: standing.pilot_id.clone(),
            pilot_name: standing.pilot_name.clone(),
            time: entry.time,
            timestamp: entry.timestamp,
            heat_name: entry.heat_name.clone(),
        })
        .collect()
}
