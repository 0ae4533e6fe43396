//! Health check endpoints.
//!
//! These endpoints are used by load balancers and orchestrators to verify
//! service health.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use order_stream_core::repository::OrderRepository;
use serde::Serialize;
use std::sync::Arc;

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"healthy"`
    pub status: &'static str,
    /// Time the check was answered
    pub timestamp: DateTime<Utc>,
}

/// Simple health check endpoint (for basic liveness).
///
/// Does NOT check dependencies.
///
/// ```text
/// GET /health
/// {"status":"healthy","timestamp":"2025-01-01T00:00:00Z"}
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
    })
}

/// Readiness response.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ReadinessResponse {
    /// Overall readiness
    pub ready: bool,
    /// Database connectivity
    pub database: bool,
}

/// Readiness check against the order store.
///
/// # Status Codes
///
/// - 200 OK: the store answered `SELECT 1`
/// - 503 Service Unavailable: it did not
///
/// Any router state that can hand out an `Arc<dyn OrderRepository>` through
/// `FromRef` can mount this handler.
pub async fn readiness_check(
    State(repository): State<Arc<dyn OrderRepository>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    match repository.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                ready: true,
                database: true,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    ready: false,
                    database: false,
                }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_stream_testing::InMemoryOrderStore;

    #[tokio::test]
    async fn test_simple_health_check() {
        let Json(body) = health_check().await;
        assert_eq!(body.status, "healthy");
    }

    #[tokio::test]
    async fn test_readiness_with_reachable_store() {
        let store: Arc<dyn OrderRepository> = Arc::new(InMemoryOrderStore::new());

        let (status, Json(body)) = readiness_check(State(store)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            ReadinessResponse {
                ready: true,
                database: true
            }
        );
    }

    #[tokio::test]
    async fn test_readiness_with_unreachable_store() {
        let store = InMemoryOrderStore::new();
        store.set_fail_reads(true);
        let store: Arc<dyn OrderRepository> = Arc::new(store);

        let (status, Json(body)) = readiness_check(State(store)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!body.ready);
    }
}
