//! # Order Stream Runtime
//!
//! Long-running plumbing shared by the order-stream binaries:
//!
//! - [`consumer`]: subscribe-process-reconnect loop over an [`EventBus`](order_stream_core::EventBus)
//! - [`handler`]: the [`EventHandler`] trait each consumer delegates to
//! - [`retry`]: backoff policy for resubscribing and for startup steps
//! - [`metrics`]: Prometheus exporter installation
//! - [`shutdown`]: process signal handling
//!
//! ## Example
//!
//! ```rust,ignore
//! let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
//!
//! let consumer = EventConsumer::builder()
//!     .name("stats")
//!     .topics(vec!["order-stats".to_string()])
//!     .event_bus(event_bus)
//!     .handler(handler)
//!     .shutdown(shutdown_rx)
//!     .build()?;
//!
//! let handle = consumer.spawn();
//! shutdown_signal().await;
//! let _ = shutdown_tx.send(());
//! handle.await?;
//! ```

pub mod consumer;
pub mod handler;
pub mod metrics;
pub mod retry;
pub mod shutdown;

pub use consumer::{ConsumerBuildError, EventConsumer, EventConsumerBuilder};
pub use handler::{EventHandler, HandlerError};
pub use metrics::{MetricsError, MetricsServer};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use shutdown::shutdown_signal;
