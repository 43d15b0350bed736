//! Export sinks
//!
//! After a snapshot is published, its ranking reports and result table are
//! pushed to every configured sink. Sink failures are logged and never touch
//! the published snapshot.

mod file_sink;
mod http_sink;

pub use file_sink::JsonFileSink;
pub use http_sink::HttpSink;

use crate::error::SinkError;
use crate::metrics::{MetricCategory, ResultTable};
use crate::snapshot::Snapshot;
use async_trait::async_trait;
use hb_common::Settings;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Categories exported as ranking reports, with their report titles
pub const REPORT_CATEGORIES: [(MetricCategory, &str); 4] = [
    (MetricCategory::BestLap, "Best Lap"),
    (MetricCategory::Consecutive2Lap, "Best 2-Lap"),
    (MetricCategory::Consecutive3Lap, "Best 3-Lap"),
    (MetricCategory::RaceTime, "Best Race Time"),
];

/// Title of the minimum-lap report
pub const MIN_LAP_REPORT_TITLE: &str = "Minimum Lap Ranking";

/// One line of a ranking report
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLine {
    pub rank: usize,
    pub pilot_name: String,
    pub time: f64,
    pub heat_name: String,
}

/// A titled ranking ready for export
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingReport {
    pub title: String,
    pub lines: Vec<ReportLine>,
}

/// Build every ranking report of a snapshot, in delivery order
pub fn ranking_reports(snapshot: &Snapshot) -> Vec<RankingReport> {
    let mut reports: Vec<RankingReport> = REPORT_CATEGORIES
        .iter()
        .map(|(category, title)| RankingReport {
            title: title.to_string(),
            lines: snapshot
                .ranking(*category)
                .into_iter()
                .map(|entry| ReportLine {
                    rank: entry.rank,
                    pilot_name: entry.pilot_name,
                    time: entry.time,
                    heat_name: entry.heat_name,
                })
                .collect(),
        })
        .collect();

    reports.push(RankingReport {
        title: MIN_LAP_REPORT_TITLE.to_string(),
        lines: snapshot
            .min_lap_ranking
            .iter()
            .map(|entry| ReportLine {
                rank: entry.rank,
                pilot_name: entry.pilot_name.clone(),
                time: entry.time,
                heat_name: entry.heat_name.clone(),
            })
            .collect(),
    });
    reports
}

/// Destination for published results
#[async_trait]
pub trait ExportSink: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Replace the exported result table
    async fn send_rows(&self, table: &ResultTable, laps_to_do: u32) -> Result<(), SinkError>;

    /// Replace one exported ranking
    async fn send_ranking(&self, report: &RankingReport) -> Result<(), SinkError>;
}

/// Sinks configured by `settings`
pub fn sinks_from_settings(settings: &Settings, client: &reqwest::Client) -> Vec<Arc<dyn ExportSink>> {
    let mut sinks: Vec<Arc<dyn ExportSink>> = Vec::new();
    if let Some(dir) = &settings.export_dir {
        sinks.push(Arc::new(JsonFileSink::new(dir.clone())));
    }
    if let Some(url) = &settings.export_url {
        sinks.push(Arc::new(HttpSink::new(client.clone(), url.clone())));
    }
    sinks
}

/// Deliver a snapshot to every sink: rankings first, then the result table
///
/// Returns the number of failed deliveries.
pub async fn deliver(sinks: &[Arc<dyn ExportSink>], snapshot: &Snapshot) -> usize {
    if sinks.is_empty() {
        return 0;
    }

    let reports = ranking_reports(snapshot);
    let mut failures = 0;

    for sink in sinks {
        for report in &reports {
            if let Err(e) = sink.send_ranking(report).await {
                warn!("Export to {} failed for '{}': {}", sink.name(), report.title, e);
                failures += 1;
            }
        }
        if let Err(e) = sink.send_rows(&snapshot.results, snapshot.laps_to_do).await {
            warn!("Export to {} failed for result rows: {}", sink.name(), e);
            failures += 1;
        }
        debug!("Export to {} finished", sink.name());
    }
    failures
}
