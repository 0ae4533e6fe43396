//! Axum integration shared by order-stream HTTP services.
//!
//! Handlers stay thin: they parse the request, call a collaborator
//! (repository, publisher, cache, event log) and map the result to a JSON
//! response. Failures become an [`AppError`], which renders the common
//! `{"success":false,"error":…,"message":…}` envelope.
//!
//! # Example
//!
//! ```ignore
//! use order_stream_web::{handlers::health_check, track_correlation_id};
//! use axum::{Router, middleware, routing::get};
//!
//! let app = Router::new()
//!     .route("/health", get(health_check))
//!     .layer(middleware::from_fn(track_correlation_id));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use error::AppError;
pub use extractors::CorrelationId;
pub use middleware::{CORRELATION_ID_HEADER, track_correlation_id};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
