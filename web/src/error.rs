//! HTTP error responses.
//!
//! Every failure leaves the API as
//! `{"success": false, "error": <label>, "message": <detail>}`, where `error`
//! is a stable label (`"Invalid price"`, `"Failed to create order"`) and
//! `message` the human-readable cause.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize)]
struct Envelope {
    success: bool,
    error: String,
    message: String,
}

/// A handler failure with its status and response envelope.
///
/// ```ignore
/// let orders = repository
///     .recent(limit)
///     .await
///     .map_err(|e| AppError::internal("Failed to fetch orders", e.to_string()))?;
/// ```
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    envelope: Envelope,
    cause: Option<anyhow::Error>,
}

impl AppError {
    /// Error with any status.
    #[must_use]
    pub fn new(status: StatusCode, error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            envelope: Envelope {
                success: false,
                error: error.into(),
                message: message.into(),
            },
            cause: None,
        }
    }

    /// Keep `cause` for the log line; the client never sees it.
    #[must_use]
    pub fn with_source(mut self, cause: anyhow::Error) -> Self {
        self.cause = Some(cause);
        self
    }

    /// 400
    #[must_use]
    pub fn bad_request(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error, message)
    }

    /// 500
    #[must_use]
    pub fn internal(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error, message)
    }

    /// Response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable label, the `error` field.
    #[must_use]
    pub fn error(&self) -> &str {
        &self.envelope.error
    }

    /// Detail, the `message` field.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.envelope.message
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.error(), self.message())
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.cause.as_ref()?.as_ref())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status.as_u16();
        let cause = self.cause.as_ref().map(|c| format!("{c:#}"));

        if self.status.is_server_error() {
            tracing::error!(
                status,
                error = %self.envelope.error,
                message = %self.envelope.message,
                cause = cause.as_deref(),
                "Request failed"
            );
        } else {
            tracing::debug!(
                status,
                error = %self.envelope.error,
                message = %self.envelope.message,
                "Request rejected"
            );
        }

        (self.status, Json(self.envelope)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("Internal server error", err.to_string()).with_source(err)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request("Invalid request body", rejection.body_text())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn render(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn display_shows_status_label_and_detail() {
        let err = AppError::bad_request("Invalid price", "price must be a number");
        assert_eq!(err.to_string(), "400 Invalid price: price must be a number");
    }

    #[tokio::test]
    async fn rejected_order_envelope() {
        let (status, body) = render(AppError::bad_request(
            "Missing required fields: user_id, store_id, region, price",
            "region is empty",
        ))
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "error": "Missing required fields: user_id, store_id, region, price",
                "message": "region is empty",
            })
        );
    }

    #[tokio::test]
    async fn server_error_keeps_detail_but_hides_cause() {
        let err = AppError::internal("Failed to create order", "connection refused")
            .with_source(anyhow::anyhow!("pool timed out"));
        let (status, body) = render(err).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "connection refused");
        assert!(!body.to_string().contains("pool timed out"));
    }

    #[test]
    fn anyhow_becomes_500_with_source() {
        let err = AppError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.error(), "Internal server error");
        assert_eq!(err.message(), "boom");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn handler_errors_propagate_with_question_mark() {
        async fn lookup(fail: bool) -> crate::WebResult<Json<u32>> {
            if fail {
                Err(anyhow::anyhow!("pool timed out"))?;
            }
            Ok(Json(7))
        }

        assert!(lookup(false).await.is_ok());
        let (status, body) = render(lookup(true).await.unwrap_err()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }
}
