//! JSON file export

use super::{ExportSink, RankingReport};
use crate::error::SinkError;
use crate::metrics::{Cell, ResultTable};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the exported result table
pub const RESULTS_FILE: &str = "RaceResult.json";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RowsDocument<'a> {
    laps_to_do: u32,
    header: &'a [String],
    rows: &'a [Vec<Cell>],
}

/// Writes `RaceResult.json` and one file per ranking into a directory
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// File name of a ranking report: lowercase title, dashes for the rest
    pub fn report_file_name(title: &str) -> String {
        let slug: String = title
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        format!("{}.json", slug)
    }

    async fn write_atomic(&self, name: &str, bytes: Vec<u8>) -> Result<(), SinkError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let target = self.dir.join(name);
        let temp = temp_path(&target);
        tokio::fs::write(&temp, bytes).await?;
        tokio::fs::rename(&temp, &target).await?;
        debug!("Wrote {}", target.display());
        Ok(())
    }
}

fn temp_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    target.with_file_name(name)
}

#[async_trait]
impl ExportSink for JsonFileSink {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn send_rows(&self, table: &ResultTable, laps_to_do: u32) -> Result<(), SinkError> {
        let document = RowsDocument {
            laps_to_do,
            header: &table.header,
            rows: &table.rows,
        };
        self.write_atomic(RESULTS_FILE, serde_json::to_vec_pretty(&document)?)
            .await
    }

    async fn send_ranking(&self, report: &RankingReport) -> Result<(), SinkError> {
        self.write_atomic(
            &Self::report_file_name(&report.title),
            serde_json::to_vec_pretty(report)?,
        )
        .await
    }
}
