//! HTTP export
//!
//! POSTs each payload as JSON tagged with `kind` (`rows` or `ranking`).

use super::{ExportSink, RankingReport};
use crate::error::SinkError;
use crate::metrics::ResultTable;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct HttpSink {
    client: reqwest::Client,
    url: String,
}

impl HttpSink {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    async fn post(&self, body: serde_json::Value) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.url)
            .timeout(REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SinkError::Rejected(status.as_u16()))
        }
    }
}

#[async_trait]
impl ExportSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    async fn send_rows(&self, table: &ResultTable, laps_to_do: u32) -> Result<(), SinkError> {
        self.post(json!({
            "kind": "rows",
            "lapsToDo": laps_to_do,
            "header": table.header,
            "rows": table.rows,
        }))
        .await
    }

    async fn send_ranking(&self, report: &RankingReport) -> Result<(), SinkError> {
        self.post(json!({
            "kind": "ranking",
            "title": report.title,
            "lines": report.lines,
        }))
        .await
    }
}
