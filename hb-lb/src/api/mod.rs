//! HTTP API handlers for hb-lb

pub mod buildinfo;
pub mod health;
pub mod leaderboard;
pub mod pilot_image;
pub mod reprocess;
pub mod settings;
pub mod sse;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use leaderboard::{get_events, get_leaderboard, get_min_laps, get_results, get_rounds, get_status};
pub use pilot_image::get_pilot_image;
pub use reprocess::trigger_reprocess;
pub use settings::{get_config, update_config};
pub use sse::event_stream;
