//! Server-Sent Events for run lifecycle notifications

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /events - SSE stream of run lifecycle events
///
/// Streams events:
/// - ConnectionStatus (once, on connect)
/// - RunStarted, SnapshotPublished, RunFailed, TriggerDropped, SettingsChanged
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    hb_common::sse::create_event_sse_stream(&state.bus, "hb-lb")
}
