//! Latest aggregate statistics.

use crate::server::state::AppState;
use axum::{Json, extract::State};
use order_stream_core::StatsSnapshot;
use serde::Serialize;

/// Response of `GET /stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Always `true`
    pub success: bool,
    /// Most recent snapshot received from the stats topic
    pub stats: StatsSnapshot,
}

/// Return the cached stats snapshot.
///
/// Before the first update this is all zeros with `lastUpdated: null`.
#[allow(clippy::unused_async)]
pub async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        success: true,
        stats: state.stats_cache.current(),
    })
}
