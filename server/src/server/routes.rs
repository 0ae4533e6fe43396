//! Router configuration for the order service.

use super::state::AppState;
use crate::api::{create_order, get_events, get_stats, list_orders};
use axum::{Router, middleware, routing::get};
use order_stream_web::track_correlation_id;
use order_stream_web::handlers::{health_check, readiness_check};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// | Method | Path | Handler |
/// |---|---|---|
/// | GET | `/health` | liveness |
/// | GET | `/health/ready` | database readiness |
/// | POST | `/orders` | create order |
/// | GET | `/orders` | recent orders |
/// | GET | `/stats` | latest stats |
/// | GET | `/events` | dashboard streams |
///
/// Every response carries `X-Correlation-ID`. CORS is permissive so the
/// dashboard can be served from another origin.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .route("/orders", get(list_orders).post(create_order))
        .route("/stats", get(get_stats))
        .route("/events", get(get_events))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(track_correlation_id))
}
