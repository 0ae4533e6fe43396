//! In-memory stand-ins for the database, the broker and the clock, so the
//! HTTP API and the consumers can be exercised without Docker.
//!
//! ```
//! use order_stream_core::environment::Clock;
//! use order_stream_testing::{InMemoryEventBus, InMemoryOrderStore, test_clock};
//!
//! let bus = InMemoryEventBus::new();
//! let store = InMemoryOrderStore::new();
//! let clock = test_clock();
//!
//! assert!(bus.published().is_empty());
//! assert!(store.is_empty());
//! assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
//! ```

pub mod clock;
pub mod event_bus;
pub mod order_store;

pub use clock::{FixedClock, test_clock};
pub use event_bus::InMemoryEventBus;
pub use order_store::InMemoryOrderStore;
