//! Pipeline engine
//!
//! One [`Engine::reprocess`] call is one run: clone the settings, build a
//! snapshot on a blocking thread, publish it, then feed the export sinks.

use crate::error::PipelineError;
use crate::export::{deliver, sinks_from_settings};
use crate::scheduler::{Reprocess, RunSummary};
use crate::snapshot::{build_snapshot, SnapshotPublisher};
use async_trait::async_trait;
use hb_common::SettingsStore;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct Engine {
    settings: SettingsStore,
    publisher: Arc<SnapshotPublisher>,
    http: reqwest::Client,
}

impl Engine {
    pub fn new(settings: SettingsStore, publisher: Arc<SnapshotPublisher>) -> Self {
        Self {
            settings,
            publisher,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Reprocess for Engine {
    async fn reprocess(&self, run_id: Uuid) -> Result<RunSummary, PipelineError> {
        // Fixed for the whole run, whatever the settings API does meanwhile
        let settings = self.settings.snapshot().await;

        let build_settings = settings.clone();
        let snapshot = tokio::task::spawn_blocking(move || build_snapshot(&build_settings, run_id))
            .await
            .map_err(|e| PipelineError::Worker(e.to_string()))??;

        let snapshot = Arc::new(snapshot);
        let summary = RunSummary {
            races: snapshot.races,
            pilots: snapshot
                .standings
                .iter()
                .filter(|s| !s.bests.is_empty())
                .count(),
            rows: snapshot.results.rows.len(),
        };
        self.publisher.publish(Arc::clone(&snapshot)).await;
        debug!("Run {} snapshot published", run_id);

        let sinks = sinks_from_settings(&settings, &self.http);
        let failures = deliver(&sinks, &snapshot).await;
        if failures > 0 {
            warn!("Run {}: {} export deliveries failed", run_id, failures);
        }

        Ok(summary)
    }
}
