//! Metric categories
//!
//! The closed set of "best of" categories a pilot is ranked in. String names
//! only appear at the settings and API edge; inside the engine a category is
//! always a [`MetricCategory`].

use super::lap_stats::LapStats;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum MetricCategory {
    #[default]
    BestLap,
    Consecutive2Lap,
    Consecutive3Lap,
    RaceTime,
    First1LapWithoutHs,
    First2LapsWithoutHs,
    First3LapsWithoutHs,
    First1LapWithHs,
    First2LapsWithHs,
    First3LapsWithHs,
}

impl MetricCategory {
    pub const ALL: [MetricCategory; 10] = [
        MetricCategory::BestLap,
        MetricCategory::Consecutive2Lap,
        MetricCategory::Consecutive3Lap,
        MetricCategory::RaceTime,
        MetricCategory::First1LapWithoutHs,
        MetricCategory::First2LapsWithoutHs,
        MetricCategory::First3LapsWithoutHs,
        MetricCategory::First1LapWithHs,
        MetricCategory::First2LapsWithHs,
        MetricCategory::First3LapsWithHs,
    ];

    /// Settings/API name
    pub fn name(self) -> &'static str {
        match self {
            MetricCategory::BestLap => "bestLap",
            MetricCategory::Consecutive2Lap => "consecutive2Lap",
            MetricCategory::Consecutive3Lap => "consecutive3Lap",
            MetricCategory::RaceTime => "raceTime",
            MetricCategory::First1LapWithoutHs => "first1LapWithoutHs",
            MetricCategory::First2LapsWithoutHs => "first2LapsWithoutHs",
            MetricCategory::First3LapsWithoutHs => "first3LapsWithoutHs",
            MetricCategory::First1LapWithHs => "first1LapWithHs",
            MetricCategory::First2LapsWithHs => "first2LapsWithHs",
            MetricCategory::First3LapsWithHs => "first3LapsWithHs",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// Leaderboard heading
    pub fn display_name(self) -> &'static str {
        match self {
            MetricCategory::BestLap => "CONSECUTIVE 1 LAP (WITHOUT HS)",
            MetricCategory::Consecutive2Lap => "CONSECUTIVE 2 LAPS (WITHOUT HS)",
            MetricCategory::Consecutive3Lap => "CONSECUTIVE 3 LAPS (WITHOUT HS)",
            MetricCategory::RaceTime => "Race Time",
            MetricCategory::First1LapWithoutHs => "First 1 LAP (WITHOUT HS)",
            MetricCategory::First2LapsWithoutHs => "First 2 LAPS (WITHOUT HS)",
            MetricCategory::First3LapsWithoutHs => "First 3 LAPS (WITHOUT HS)",
            MetricCategory::First1LapWithHs => "First 1 LAP (WITH HS)",
            MetricCategory::First2LapsWithHs => "First 2 LAPS (WITH HS)",
            MetricCategory::First3LapsWithHs => "First 3 LAPS (WITH HS)",
        }
    }

    /// The value this category takes from one race's lap stats
    pub fn value(self, stats: &LapStats) -> Option<f64> {
        match self {
            MetricCategory::BestLap => stats.best_lap,
            MetricCategory::Consecutive2Lap => stats.consecutive_2,
            MetricCategory::Consecutive3Lap => stats.consecutive_3,
            MetricCategory::RaceTime => stats.race_time,
            MetricCategory::First1LapWithoutHs => stats.first_without_hs[0],
            MetricCategory::First2LapsWithoutHs => stats.first_without_hs[1],
            MetricCategory::First3LapsWithoutHs => stats.first_without_hs[2],
            MetricCategory::First1LapWithHs => stats.first_with_hs[0],
            MetricCategory::First2LapsWithHs => stats.first_with_hs[1],
            MetricCategory::First3LapsWithHs => stats.first_with_hs[2],
        }
    }
}

impl fmt::Display for MetricCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for category in MetricCategory::ALL {
            assert_eq!(MetricCategory::from_name(category.name()), Some(category));
        }
        assert_eq!(MetricCategory::from_name("fastest"), None);
    }

    #[test]
    fn test_serde_uses_settings_names() {
        for category in MetricCategory::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.name()));
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(
            MetricCategory::BestLap.display_name(),
            "CONSECUTIVE 1 LAP (WITHOUT HS)"
        );
        assert_eq!(MetricCategory::RaceTime.display_name(), "Race Time");
        assert_eq!(
            MetricCategory::First2LapsWithHs.display_name(),
            "First 2 LAPS (WITH HS)"
        );
    }
}
