//! Application state for the HTTP server.

use crate::publisher::OrderPublisher;
use axum::extract::FromRef;
use order_stream_core::environment::Clock;
use order_stream_core::event_log::DEFAULT_VIEW_SIZE;
use order_stream_core::{EventLog, OrderRepository, StatsCache};
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every field is behind an `Arc`. The stats cache and
/// the event log are the same instances the stats consumer writes to.
#[derive(Clone)]
pub struct AppState {
    /// Order persistence
    pub repository: Arc<dyn OrderRepository>,

    /// Outbound order events
    pub publisher: Arc<OrderPublisher>,

    /// Latest stats snapshot
    pub stats_cache: Arc<StatsCache>,

    /// Dashboard activity log
    pub event_log: Arc<EventLog>,

    /// Time source for `created_at` and log timestamps
    pub clock: Arc<dyn Clock>,

    /// Entries per stream returned by `GET /events`
    pub view_size: usize,
}

impl AppState {
    /// Create a new application state with the default view size.
    #[must_use]
    pub fn new(
        repository: Arc<dyn OrderRepository>,
        publisher: Arc<OrderPublisher>,
        stats_cache: Arc<StatsCache>,
        event_log: Arc<EventLog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            publisher,
            stats_cache,
            event_log,
            clock,
            view_size: DEFAULT_VIEW_SIZE,
        }
    }

    /// Override how many entries `GET /events` returns per stream.
    #[must_use]
    pub const fn with_view_size(mut self, view_size: usize) -> Self {
        self.view_size = view_size;
        self
    }
}

// Lets the shared readiness handler pull the repository out of AppState
impl FromRef<AppState> for Arc<dyn OrderRepository> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.repository.clone()
    }
}
