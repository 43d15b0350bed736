//! # Heatboard Common Library
//!
//! Shared code for the Heatboard services including:
//! - Error types
//! - Settings loading, validation and persistence
//! - Event types (BoardEvent enum) and the EventBus
//! - Server-Sent Events helpers
//! - Timestamp utilities for timing-system exports

pub mod config;
pub mod error;
pub mod events;
pub mod sse;
pub mod time;

pub use config::{Settings, SettingsStore};
pub use error::{Error, Result};
pub use events::{BoardEvent, EventBus};
