//! API endpoints for the order service.
//!
//! - Orders: create and list
//! - Stats: latest aggregate snapshot
//! - Events: recent activity for the dashboard

pub mod events;
pub mod orders;
pub mod stats;

pub use events::get_events;
pub use orders::{create_order, list_orders};
pub use stats::get_stats;
