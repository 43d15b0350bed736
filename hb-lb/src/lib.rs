//! hb-lb library - Heatboard leaderboard service
//!
//! Watches a timing-system data folder, recomputes pilot rankings, heat
//! results and next-heat information when it changes, and serves the latest
//! snapshot over HTTP.

use axum::Router;
use chrono::{DateTime, Utc};
use hb_common::{EventBus, SettingsStore};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod engine;
pub mod error;
pub mod export;
pub mod heat;
pub mod metrics;
pub mod normalize;
pub mod scheduler;
pub mod snapshot;
pub mod source;
pub mod watcher;

use scheduler::SchedulerHandle;
use snapshot::SnapshotPublisher;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live settings (read per request, updated by POST /api/config)
    pub settings: SettingsStore,
    /// Holder of the latest published snapshot
    pub publisher: Arc<SnapshotPublisher>,
    /// Trigger sink for manual and settings-driven runs
    pub scheduler: SchedulerHandle,
    /// Run lifecycle events for `/events`
    pub bus: EventBus,
    pub startup_time: DateTime<Utc>,
    /// Static UI directory served for unmatched paths
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        settings: SettingsStore,
        publisher: Arc<SnapshotPublisher>,
        scheduler: SchedulerHandle,
        bus: EventBus,
        static_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            settings,
            publisher,
            scheduler,
            bus,
            startup_time: hb_common::time::now(),
            static_dir,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let static_dir = state.static_dir.clone();

    let router = Router::new()
        // Snapshot reads
        .route("/api/leaderboard", get(api::get_leaderboard))
        .route("/api/min_laps", get(api::get_min_laps))
        .route("/api/results", get(api::get_results))
        .route("/api/events", get(api::get_events))
        .route("/api/rounds", get(api::get_rounds))
        .route("/api/status", get(api::get_status))
        .route("/api/pilot_image", get(api::get_pilot_image))
        // Settings and control
        .route("/api/config", get(api::get_config).post(api::update_config))
        .route("/api/reprocess", post(api::trigger_reprocess))
        .route("/api/buildinfo", get(api::get_build_info))
        // SSE event stream
        .route("/events", get(api::event_stream))
        .merge(api::health_routes());

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
