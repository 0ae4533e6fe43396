//! Correlation-id propagation.
//!
//! [`track_correlation_id`] runs around every request: it takes the caller's
//! `X-Correlation-ID` (or mints one), makes it available to handlers through
//! the [`CorrelationId`] extractor, runs the rest of the stack inside a span
//! carrying it, and echoes it on the response.
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use order_stream_web::track_correlation_id;
//!
//! let app = Router::new()
//!     .route("/orders", get(list_orders))
//!     .layer(middleware::from_fn(track_correlation_id));
//! ```

use crate::extractors::CorrelationId;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;

/// Request and response header carrying the correlation id.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// Attach a [`CorrelationId`] to the request, its span and its response.
///
/// Install with `axum::middleware::from_fn(track_correlation_id)` as the
/// outermost layer so rejections and 404s carry the header too.
pub async fn track_correlation_id(mut request: Request, next: Next) -> Response {
    let id = CorrelationId::from_headers(request.headers()).unwrap_or_default();
    request.extensions_mut().insert(id);

    let span = tracing::info_span!(
        "request",
        correlation_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );

    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}
