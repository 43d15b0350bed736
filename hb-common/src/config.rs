//! Settings loading, persistence and config file resolution
//!
//! Settings live in a flat TOML file. The file is read at startup and written
//! back whenever the settings API applies a patch. Every pipeline run works on
//! a cloned [`Settings`] value so a concurrent update never changes a run in
//! flight.
//!
//! # Config file resolution
//!
//! 1. Command-line argument (highest priority)
//! 2. `HB_CONFIG` environment variable
//! 3. `<user config dir>/heatboard/heatboard.toml` if it exists
//! 4. `./heatboard.toml` (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Environment variable naming the settings file
pub const CONFIG_ENV_VAR: &str = "HB_CONFIG";

/// Settings file name used for the default locations
pub const CONFIG_FILE_NAME: &str = "heatboard.toml";

/// Flat settings object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Timing-system data folder; events live under `<root>/events`
    pub source_root_path: PathBuf,
    /// Event directory name to aggregate, or `"all"`
    pub selected_event_id: String,
    /// Leaderboard scope: `all`, `allRace`, `allPractice`, `allTimeTrial`,
    /// `allEndurance` or a round id
    pub leaderboard_round: String,
    /// Ranking category name used by the leaderboard and next-heat ranks
    pub sorted_by: String,
    /// HTTP port
    pub port: u16,
    /// Directory receiving exported result/ranking files
    pub export_dir: Option<PathBuf>,
    /// Endpoint receiving exported result/ranking payloads
    pub export_url: Option<String>,
    /// Directory of static UI files served at `/`
    pub static_dir: Option<PathBuf>,
    /// Quiet period before a burst of file changes triggers a run
    pub debounce_ms: u64,
    /// Polling interval of the source tree watcher
    pub poll_interval_ms: u64,
    /// Run once more after a run that overlapped a trigger
    pub retrigger_on_overlap: bool,
    /// Default tracing directive when `RUST_LOG` is unset
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_root_path: PathBuf::from("."),
            selected_event_id: "all".to_string(),
            leaderboard_round: "all".to_string(),
            sorted_by: "bestLap".to_string(),
            port: 3000,
            export_dir: None,
            export_url: None,
            static_dir: None,
            debounce_ms: 5000,
            poll_interval_ms: 1000,
            retrigger_on_overlap: false,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Directory holding one subdirectory per event
    pub fn events_dir(&self) -> PathBuf {
        self.source_root_path.join("events")
    }

    /// Global channel directory file
    pub fn channels_path(&self) -> PathBuf {
        self.source_root_path.join("httpfiles").join("Channels.json")
    }
}

/// Partial update accepted by the settings API
///
/// Unknown keys are rejected so a typo never silently does nothing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsPatch {
    pub source_root_path: Option<PathBuf>,
    pub selected_event_id: Option<String>,
    pub leaderboard_round: Option<String>,
    pub sorted_by: Option<String>,
    pub port: Option<u16>,
    pub export_dir: Option<PathBuf>,
    pub export_url: Option<String>,
    pub static_dir: Option<PathBuf>,
    pub debounce_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub retrigger_on_overlap: Option<bool>,
    pub log_level: Option<String>,
}

impl SettingsPatch {
    /// Merge this patch over `settings`, returning the new value
    pub fn apply(self, settings: &Settings) -> Result<Settings> {
        let mut next = settings.clone();

        if let Some(v) = self.source_root_path {
            next.source_root_path = v;
        }
        if let Some(v) = self.selected_event_id {
            next.selected_event_id = non_empty("selected_event_id", v)?;
        }
        if let Some(v) = self.leaderboard_round {
            next.leaderboard_round = non_empty("leaderboard_round", v)?;
        }
        if let Some(v) = self.sorted_by {
            next.sorted_by = non_empty("sorted_by", v)?;
        }
        if let Some(v) = self.port {
            next.port = v;
        }
        if let Some(v) = self.export_dir {
            next.export_dir = Some(v);
        }
        if let Some(v) = self.export_url {
            next.export_url = if v.trim().is_empty() { None } else { Some(v) };
        }
        if let Some(v) = self.static_dir {
            next.static_dir = Some(v);
        }
        if let Some(v) = self.debounce_ms {
            next.debounce_ms = v;
        }
        if let Some(v) = self.poll_interval_ms {
            if v == 0 {
                return Err(Error::InvalidInput(
                    "poll_interval_ms must be greater than zero".to_string(),
                ));
            }
            next.poll_interval_ms = v;
        }
        if let Some(v) = self.retrigger_on_overlap {
            next.retrigger_on_overlap = v;
        }
        if let Some(v) = self.log_level {
            next.log_level = non_empty("log_level", v)?;
        }

        Ok(next)
    }
}

fn non_empty(key: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        Err(Error::InvalidInput(format!("{} cannot be empty", key)))
    } else {
        Ok(value)
    }
}

/// Resolve the settings file path
pub fn resolve_config_path(cli_arg: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: user config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("heatboard").join(CONFIG_FILE_NAME)) {
        if path.exists() {
            return path;
        }
    }

    // Priority 4: working directory
    PathBuf::from(CONFIG_FILE_NAME)
}

/// Load settings from a TOML file
///
/// A missing or unreadable file never stops the service: a warning is logged
/// and defaults are used.
pub fn load_settings(path: &Path) -> Settings {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(
                "Settings file {} not readable ({}), using default values",
                path.display(),
                e
            );
            return Settings::default();
        }
    };

    match toml::from_str::<Settings>(&content) {
        Ok(settings) => settings,
        Err(e) => {
            warn!(
                "Settings file {} could not be parsed ({}), using default values",
                path.display(),
                e
            );
            Settings::default()
        }
    }
}

/// Write settings atomically (temp file + rename)
pub fn write_settings(settings: &Settings, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(settings)
        .map_err(|e| Error::Config(format!("Serialize settings failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, content)?;
    std::fs::rename(&temp_path, path)?;

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| CONFIG_FILE_NAME.into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Shared settings holder
///
/// Readers take a cloned [`Settings`] snapshot; writers go through
/// [`SettingsStore::update`], which persists before swapping.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<RwLock<Settings>>,
    path: Arc<PathBuf>,
}

impl SettingsStore {
    pub fn new(settings: Settings, path: PathBuf) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
            path: Arc::new(path),
        }
    }

    /// Path of the backing settings file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clone of the current settings
    pub async fn snapshot(&self) -> Settings {
        self.inner.read().await.clone()
    }

    /// Apply a patch, persist it, and return the new settings
    ///
    /// The in-memory value only changes if the file write succeeds.
    pub async fn update(&self, patch: SettingsPatch) -> Result<Settings> {
        let mut guard = self.inner.write().await;
        let next = patch.apply(&guard)?;

        let to_write = next.clone();
        let path = PathBuf::clone(&self.path);
        tokio::task::spawn_blocking(move || write_settings(&to_write, &path))
            .await
            .map_err(|e| Error::Internal(format!("Settings writer failed: {}", e)))??;

        *guard = next.clone();
        Ok(next)
    }
}
