//! Settings read/update endpoints

use axum::{body::Bytes, extract::State, Json};
use hb_common::config::SettingsPatch;
use hb_common::events::RunTrigger;
use hb_common::{BoardEvent, Settings};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics::MetricCategory;
use crate::AppState;

/// POST /api/config response
#[derive(Debug, Serialize)]
pub struct UpdateConfigResponse {
    pub message: String,
    pub settings: Settings,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings.snapshot().await)
}

/// POST /api/config
///
/// Body is a JSON object holding any subset of the settings keys. The merged
/// settings are validated, written to the settings file, and a run is
/// triggered.
pub async fn update_config(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<UpdateConfigResponse>> {
    let patch: SettingsPatch = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid settings payload: {}", e)))?;

    if let Some(name) = &patch.sorted_by {
        if MetricCategory::from_name(name).is_none() {
            return Err(ApiError::BadRequest(format!(
                "Unknown ranking category: {}",
                name
            )));
        }
    }

    let settings = state.settings.update(patch).await?;
    info!("Settings updated and saved to {}", state.settings.path().display());

    state.bus.emit(BoardEvent::SettingsChanged {
        timestamp: hb_common::time::now(),
    });
    if !state.scheduler.notify(RunTrigger::SettingsChanged) {
        warn!("Scheduler is not running; settings change will not be processed");
    }

    Ok(Json(UpdateConfigResponse {
        message: "Config saved successfully".to_string(),
        settings,
    }))
}
