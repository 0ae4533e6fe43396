//! Request extractors.

use crate::middleware::CORRELATION_ID_HEADER;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use std::convert::Infallible;
use std::fmt;
use uuid::Uuid;

/// Identifier tying together the log lines of one request.
///
/// Taken from the request extension set by
/// [`track_correlation_id`](crate::track_correlation_id), so a handler logs the
/// same id the response carries. Without that middleware it is read from the
/// `X-Correlation-ID` header, or freshly generated.
///
/// ```ignore
/// async fn create_order(correlation_id: CorrelationId, ..) {
///     tracing::info!(%correlation_id, "Order created");
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// A new random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The id in `X-Correlation-ID`, if present and a valid UUID.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let raw = headers.get(CORRELATION_ID_HEADER)?.to_str().ok()?;
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Self>()
            .copied()
            .or_else(|| Self::from_headers(&parts.headers))
            .unwrap_or_default())
    }
}
