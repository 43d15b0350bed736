//! Snapshot assembly and publication
//!
//! A [`Snapshot`] is everything readers see from one pipeline run. It is
//! built off to the side and published by swapping one `Arc`, so readers get
//! either the previous snapshot or the new one, never a mix.

use crate::error::PipelineError;
use crate::heat::{locate_heats, LatestHeat, NextHeat};
use crate::metrics::{
    aggregate, rank_category, MetricCategory, MinLapEntry, PilotStanding, RankingEntry,
    ResultTable,
};
use crate::normalize::{normalize, pilot_directory, LeaderboardScope, KNOWN_EVENT_TYPES};
use crate::source::{load_source_tree, EventSummary, SourceTree, ALL_EVENTS, DEFAULT_TARGET_LAPS};
use chrono::{DateTime, Utc};
use hb_common::Settings;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

/// Pilot directory entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotInfo {
    pub id: String,
    pub name: String,
    pub photo_path: Option<String>,
}

/// Leaderboard scope choice offered to the UI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundOption {
    pub id: String,
    pub name: String,
}

/// Immutable result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// `None` until the first run publishes
    pub run_id: Option<Uuid>,
    pub generated_at: Option<DateTime<Utc>>,
    /// Name of the last selected event
    pub event_name: String,
    /// Target lap count of the last selected event
    pub laps_to_do: u32,
    pub events: Vec<EventSummary>,
    pub rounds: Vec<RoundOption>,
    /// Leaderboard scope the run used
    pub scope: String,
    pub round_name: String,
    /// Ranking category the run used
    pub sorted_by: MetricCategory,
    /// Valid races inside the scope
    pub races: usize,
    pub standings: Vec<PilotStanding>,
    pub pilots: BTreeMap<String, PilotInfo>,
    pub latest_heat: Option<LatestHeat>,
    pub next_heat: Option<NextHeat>,
    pub min_lap_ranking: Vec<MinLapEntry>,
    pub results: ResultTable,
}

impl Snapshot {
    /// Placeholder served before the first successful run
    pub fn empty() -> Self {
        Self {
            run_id: None,
            generated_at: None,
            event_name: String::new(),
            laps_to_do: DEFAULT_TARGET_LAPS,
            events: Vec::new(),
            rounds: vec![all_rounds_option()],
            scope: LeaderboardScope::All.to_string(),
            round_name: round_name(&LeaderboardScope::All, &[]),
            sorted_by: MetricCategory::default(),
            races: 0,
            standings: Vec::new(),
            pilots: BTreeMap::new(),
            latest_heat: None,
            next_heat: None,
            min_lap_ranking: Vec::new(),
            results: ResultTable::from_rows(&[]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.run_id.is_none()
    }

    /// Ranking of one category
    pub fn ranking(&self, category: MetricCategory) -> Vec<RankingEntry> {
        rank_category(&self.standings, category)
    }
}

fn all_rounds_option() -> RoundOption {
    RoundOption {
        id: LeaderboardScope::All.to_string(),
        name: "All Rounds".to_string(),
    }
}

/// Scope choices for the selected event
///
/// With every event selected only the global choice is offered, since round
/// ids are per event.
pub fn round_options(tree: &SourceTree, selected_event_id: &str) -> Vec<RoundOption> {
    let mut options = vec![all_rounds_option()];
    if selected_event_id == ALL_EVENTS {
        return options;
    }
    let Some(event) = tree.events.iter().find(|e| e.dir_id == selected_event_id) else {
        return options;
    };

    options.extend(KNOWN_EVENT_TYPES.iter().map(|t| RoundOption {
        id: LeaderboardScope::EventType(t.to_string()).to_string(),
        name: format!("All {} Rounds", t),
    }));
    options.extend(event.rounds.iter().filter(|r| r.valid).map(|r| RoundOption {
        id: r.id.clone(),
        name: format!("{}Round{}", r.event_type, r.round_number),
    }));
    options
}

/// Human-readable name of a scope
pub fn round_name(scope: &LeaderboardScope, rounds: &[RoundOption]) -> String {
    match scope {
        LeaderboardScope::All => "All Rounds".to_string(),
        LeaderboardScope::EventType(t) => format!("All {} Rounds", t),
        LeaderboardScope::Round(id) => rounds
            .iter()
            .find(|r| r.id == *id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| id.clone()),
    }
}

/// Resolve the configured ranking category, falling back to the default
pub fn resolve_category(name: &str) -> MetricCategory {
    MetricCategory::from_name(name).unwrap_or_else(|| {
        warn!(
            "Unknown ranking category '{}', using {}",
            name,
            MetricCategory::default()
        );
        MetricCategory::default()
    })
}

/// Derive a snapshot from an already loaded source tree
pub fn assemble(
    tree: &SourceTree,
    settings: &Settings,
    run_id: Uuid,
    generated_at: DateTime<Utc>,
) -> Snapshot {
    let scope = LeaderboardScope::parse(&settings.leaderboard_round);
    let sorted_by = resolve_category(&settings.sorted_by);

    let races = normalize(tree);
    let aggregation = aggregate(&races, &scope);

    let directory = pilot_directory(tree);
    let ranking = rank_category(&aggregation.standings, sorted_by);
    let (latest_heat, next_heat) = locate_heats(&races, &directory, &tree.channels, &ranking);

    let rounds = round_options(tree, &settings.selected_event_id);
    let last_event = tree.events.last();

    Snapshot {
        run_id: Some(run_id),
        generated_at: Some(generated_at),
        event_name: last_event.map(|e| e.event.name.clone()).unwrap_or_default(),
        laps_to_do: last_event.map(|e| e.event.laps).unwrap_or(DEFAULT_TARGET_LAPS),
        events: tree.event_directory.clone(),
        round_name: round_name(&scope, &rounds),
        rounds,
        scope: scope.to_string(),
        sorted_by,
        races: aggregation.scoped_races,
        pilots: directory
            .into_values()
            .map(|p| {
                (
                    p.id.clone(),
                    PilotInfo {
                        id: p.id,
                        name: p.name,
                        photo_path: p.photo_path,
                    },
                )
            })
            .collect(),
        results: ResultTable::from_rows(&aggregation.rows),
        standings: aggregation.standings,
        latest_heat,
        next_heat,
        min_lap_ranking: aggregation.min_laps,
    }
}

/// Load the source tree named by `settings` and derive a snapshot
///
/// Blocking: reads the whole tree from disk.
pub fn build_snapshot(settings: &Settings, run_id: Uuid) -> Result<Snapshot, PipelineError> {
    let tree = load_source_tree(
        &settings.events_dir(),
        &settings.channels_path(),
        &settings.selected_event_id,
    )?;
    Ok(assemble(&tree, settings, run_id, hb_common::time::now()))
}

/// Holder of the published snapshot
pub struct SnapshotPublisher {
    current: RwLock<Arc<Snapshot>>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }

    /// Replace the published snapshot
    pub async fn publish(&self, snapshot: Arc<Snapshot>) {
        *self.current.write().await = snapshot;
    }

    /// The published snapshot
    pub async fn current(&self) -> Arc<Snapshot> {
        Arc::clone(&*self.current.read().await)
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}
