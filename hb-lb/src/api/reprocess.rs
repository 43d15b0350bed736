//! Manual reprocessing trigger

use axum::{extract::State, http::StatusCode, Json};
use hb_common::events::RunTrigger;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// POST /api/reprocess
///
/// Queues a run immediately. The run itself is reported over `/events`; a
/// run already in flight means this trigger is dropped or queued per the
/// overlap setting.
pub async fn trigger_reprocess(State(state): State<AppState>) -> ApiResult<(StatusCode, Json<Value>)> {
    info!("Manual reprocess requested");
    if !state.scheduler.notify(RunTrigger::Manual) {
        return Err(ApiError::Internal("Scheduler is not running".to_string()));
    }
    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": "Reprocess requested" })),
    ))
}
