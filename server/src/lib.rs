//! Order ingress service.
//!
//! Accepts orders over HTTP, stores them in PostgreSQL and publishes them to
//! the `orders` topic. A background consumer follows `order-stats`, keeping the
//! latest aggregate snapshot and a short activity log for the dashboard.
//!
//! ```text
//! POST /orders ─► PostgresOrderStore ─► OrderPublisher("orders") ─► EventLog(kstream)
//!
//! "order-stats" ─► EventConsumer ─► StatsUpdateHandler ─► StatsCache + EventLog(ktable)
//! ```

#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod handlers;
pub mod lifecycle;
pub mod metrics;
pub mod publisher;
pub mod server;

pub use config::Config;
pub use handlers::StatsUpdateHandler;
pub use lifecycle::{Application, StartupError};
pub use publisher::{OrderPublisher, PublishError};
pub use server::{AppState, build_router};
