//! Raw record shapes of the timing-system export
//!
//! Field names follow the export's PascalCase JSON. Unknown fields are
//! ignored and missing fields take their defaults, so older or newer exports
//! still load; only structurally broken files fail to parse.

use serde::{Deserialize, Deserializer};

/// Target lap count used when `Event.json` carries none
pub const DEFAULT_TARGET_LAPS: u32 = 4;

fn default_target_laps() -> u32 {
    DEFAULT_TARGET_LAPS
}

fn default_event_type() -> String {
    "Race".to_string()
}

/// Treat an explicit JSON `null` like a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One entry of `Event.json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventRecord {
    #[serde(rename = "ID", default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    /// Target lap count of a race
    #[serde(default = "default_target_laps")]
    pub laps: u32,
}

/// One entry of `Pilots.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PilotRecord {
    #[serde(rename = "ID", default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default)]
    pub photo_path: Option<String>,
}

/// One entry of `Rounds.json`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoundRecord {
    #[serde(rename = "ID", default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub round_number: i32,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub valid: bool,
}

/// The single entry of `Race.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RaceRecord {
    #[serde(rename = "ID", default, deserialize_with = "nullable")]
    pub id: String,
    /// Round id this race belongs to
    #[serde(default, deserialize_with = "nullable")]
    pub round: String,
    #[serde(default, deserialize_with = "nullable")]
    pub race_number: i32,
    #[serde(default, deserialize_with = "nullable")]
    pub valid: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub laps: Vec<LapRecord>,
    #[serde(default, deserialize_with = "nullable")]
    pub detections: Vec<DetectionRecord>,
    #[serde(default, deserialize_with = "nullable")]
    pub pilot_channels: Vec<PilotChannelRecord>,
}

/// Lap embedded in `Race.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LapRecord {
    #[serde(rename = "ID", default, deserialize_with = "nullable")]
    pub id: String,
    /// Detection id this lap was closed by
    #[serde(default, deserialize_with = "nullable")]
    pub detection: String,
    /// 0 is the holeshot
    #[serde(default, deserialize_with = "nullable")]
    pub lap_number: i32,
    #[serde(default, deserialize_with = "nullable")]
    pub length_seconds: f64,
    #[serde(default)]
    pub start_time: Option<String>,
}

/// Detection embedded in `Race.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectionRecord {
    #[serde(rename = "ID", default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub pilot: String,
    #[serde(default, deserialize_with = "nullable")]
    pub valid: bool,
}

/// Pilot/channel assignment embedded in `Race.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PilotChannelRecord {
    #[serde(default, deserialize_with = "nullable")]
    pub pilot: String,
    #[serde(default, deserialize_with = "nullable")]
    pub channel: String,
}

/// One entry of `Result.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultRecord {
    #[serde(default, deserialize_with = "nullable")]
    pub pilot: String,
    #[serde(default)]
    pub position: Option<i32>,
}

/// One entry of the global `Channels.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChannelRecord {
    #[serde(rename = "ID", default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub display_name: String,
}
