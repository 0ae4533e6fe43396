//! # Order Stream Core
//!
//! Domain types and collaborator traits shared by every order-stream crate.
//!
//! The ingress API accepts orders, persists them through an [`OrderRepository`],
//! and forwards them to the broker through an [`EventBus`]. An external streams
//! application aggregates the `orders` topic and publishes running statistics to
//! `order-stats`, which the service consumes into a [`StatsCache`].
//!
//! Recent activity on both sides is kept in an [`EventLog`]: two bounded,
//! newest-first sequences used only for dashboard display.
//!
//! ```text
//! POST /orders ──► OrderRepository ──► EventBus("orders") ──► EventLog(Orders)
//!
//! EventBus("order-stats") ──► StatsCache ──► EventLog(Stats)
//! ```
//!
//! ## Example
//!
//! ```
//! use order_stream_core::event_log::{BoundedLog};
//!
//! let mut log = BoundedLog::new(3);
//! for entry in ['A', 'B', 'C', 'D'] {
//!     log.record(entry);
//! }
//! assert_eq!(log.read(10), vec!['D', 'C', 'B']);
//! ```

#![forbid(unsafe_code)]

pub use chrono::{DateTime, Utc};

pub mod event;
pub mod event_bus;
pub mod event_log;
pub mod order;
pub mod repository;
pub mod stats;
pub mod stats_cache;

pub use event::{EventError, EventRecord};
pub use event_bus::{EventBus, EventBusError, EventStream};
pub use event_log::{BoundedLog, EventLog, LogEntry, LogPayload, LogStream, ProcessingStage};
pub use order::{NewOrder, Order, OrderError, OrderId, OrderStatus};
pub use repository::{OrderRepository, RepositoryError};
pub use stats::{OrderStats, RegionStats, StatsDocument, StatsSnapshot};
pub use stats_cache::StatsCache;

/// Services handlers read from the outside world instead of calling directly.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Source of `created_at` and event-log timestamps.
    ///
    /// `SystemClock` in the binaries; a stopped clock in tests.
    pub trait Clock: Send + Sync {
        /// Current instant in UTC.
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
