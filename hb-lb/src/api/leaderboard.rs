//! Read endpoints over the published snapshot
//!
//! Every handler reads one `Arc<Snapshot>` and answers from it alone, so a
//! response never mixes two runs.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::heat::NextHeatPilot;
use crate::metrics::{MinLapEntry, ResultTable};
use crate::scheduler::SchedulerStats;
use crate::snapshot::{resolve_category, RoundOption};
use crate::source::EventSummary;
use crate::AppState;

/// One leaderboard line
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub pilot_id: String,
    pub pilot_name: String,
    pub time: f64,
    pub heat_name: String,
}

/// GET /api/leaderboard response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub event_name: String,
    pub round_name: String,
    pub sorted_by: String,
    pub sorted_by_display_name: String,
    pub ranking: Vec<LeaderboardEntry>,
    pub last_heat_name: Option<String>,
    pub next_heat_name: Option<String>,
    pub next_heat_pilots: Vec<NextHeatPilot>,
    pub last_heat_pilot_ids: Vec<String>,
    pub generated_at: Option<DateTime<Utc>>,
}

/// GET /api/leaderboard
///
/// Ranking of the currently configured category. The snapshot holds bests for
/// every category, so a category change shows without waiting for a run.
pub async fn get_leaderboard(State(state): State<AppState>) -> Json<LeaderboardResponse> {
    let snapshot = state.publisher.current().await;
    let category = resolve_category(&state.settings.snapshot().await.sorted_by);

    let ranking = snapshot
        .ranking(category)
        .into_iter()
        .map(|entry| LeaderboardEntry {
            pilot_id: entry.pilot_id,
            pilot_name: entry.pilot_name,
            time: entry.time,
            heat_name: entry.heat_name,
        })
        .collect();

    Json(LeaderboardResponse {
        event_name: snapshot.event_name.clone(),
        round_name: snapshot.round_name.clone(),
        sorted_by: category.name().to_string(),
        sorted_by_display_name: category.display_name().to_string(),
        ranking,
        last_heat_name: snapshot.latest_heat.as_ref().map(|h| h.name.clone()),
        next_heat_name: snapshot.next_heat.as_ref().map(|h| h.name.clone()),
        next_heat_pilots: snapshot
            .next_heat
            .as_ref()
            .map(|h| h.pilots.clone())
            .unwrap_or_default(),
        last_heat_pilot_ids: snapshot
            .latest_heat
            .as_ref()
            .map(|h| h.pilot_ids.clone())
            .unwrap_or_default(),
        generated_at: snapshot.generated_at,
    })
}

/// GET /api/min_laps
pub async fn get_min_laps(State(state): State<AppState>) -> Json<Vec<MinLapEntry>> {
    Json(state.publisher.current().await.min_lap_ranking.clone())
}

/// GET /api/results response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsResponse {
    pub laps_to_do: u32,
    #[serde(flatten)]
    pub table: ResultTable,
}

/// GET /api/results
pub async fn get_results(State(state): State<AppState>) -> Json<ResultsResponse> {
    let snapshot = state.publisher.current().await;
    Json(ResultsResponse {
        laps_to_do: snapshot.laps_to_do,
        table: snapshot.results.clone(),
    })
}

/// GET /api/events
pub async fn get_events(State(state): State<AppState>) -> Json<Vec<EventSummary>> {
    Json(state.publisher.current().await.events.clone())
}

/// GET /api/rounds
pub async fn get_rounds(State(state): State<AppState>) -> Json<Vec<RoundOption>> {
    Json(state.publisher.current().await.rounds.clone())
}

/// GET /api/status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub scheduler: SchedulerStats,
    pub run_id: Option<Uuid>,
    pub generated_at: Option<DateTime<Utc>>,
    pub startup_time: DateTime<Utc>,
    pub uptime_seconds: i64,
}

/// GET /api/status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let snapshot = state.publisher.current().await;
    Json(StatusResponse {
        scheduler: state.scheduler.stats(),
        run_id: snapshot.run_id,
        generated_at: snapshot.generated_at,
        startup_time: state.startup_time,
        uptime_seconds: (hb_common::time::now() - state.startup_time).num_seconds(),
    })
}
