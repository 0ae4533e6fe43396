//! Dashboard view of recent activity.

use crate::server::state::AppState;
use axum::{Json, extract::State};
use order_stream_core::{LogEntry, LogStream};
use serde::Serialize;

/// Response of `GET /events`.
#[derive(Debug, Serialize)]
pub struct EventsResponse {
    /// Always `true`
    pub success: bool,
    /// Recently published orders, newest first
    pub kstream: Vec<LogEntry>,
    /// Recently received stats snapshots, newest first
    pub ktable: Vec<LogEntry>,
}

/// Return the newest entries of both streams, up to the configured view size.
#[allow(clippy::unused_async)]
pub async fn get_events(State(state): State<AppState>) -> Json<EventsResponse> {
    Json(EventsResponse {
        success: true,
        kstream: state.event_log.read(LogStream::Orders, state.view_size),
        ktable: state.event_log.read(LogStream::Stats, state.view_size),
    })
}
