//! Event types for the Heatboard event system
//!
//! Provides the shared event definitions and the EventBus used to fan run
//! lifecycle notifications out to SSE clients and tests.

mod run_types;

pub use run_types::{RunState, RunTrigger};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Heatboard event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BoardEvent {
    /// A pipeline run started
    RunStarted {
        run_id: Uuid,
        trigger: RunTrigger,
        timestamp: DateTime<Utc>,
    },

    /// A run finished and its snapshot replaced the published one
    SnapshotPublished {
        run_id: Uuid,
        /// Valid races aggregated by the run
        races: usize,
        /// Pilots with at least one category entry
        pilots: usize,
        /// Run duration in milliseconds
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A run failed; the previous snapshot stays published
    RunFailed {
        run_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },

    /// A trigger fired while a run was in flight and was not executed
    TriggerDropped {
        trigger: RunTrigger,
        timestamp: DateTime<Utc>,
    },

    /// Settings were replaced through the API
    SettingsChanged { timestamp: DateTime<Utc> },
}

impl BoardEvent {
    /// Event type name, used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            BoardEvent::RunStarted { .. } => "RunStarted",
            BoardEvent::SnapshotPublished { .. } => "SnapshotPublished",
            BoardEvent::RunFailed { .. } => "RunFailed",
            BoardEvent::TriggerDropped { .. } => "TriggerDropped",
            BoardEvent::SettingsChanged { .. } => "SettingsChanged",
        }
    }
}

/// Broadcast channel for [`BoardEvent`]s
///
/// Cloning the bus shares the same channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BoardEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns the number of subscribers reached; having none is not an error
    /// for lifecycle events, so callers usually ignore the result.
    pub fn emit(&self, event: BoardEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
