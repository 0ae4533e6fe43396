//! Order statistics aggregator.
//!
//! Consumes the `orders` topic and keeps a global running total per region,
//! publishing the updated [`OrderStats`](order_stream_core::OrderStats) to
//! `order-stats` after every order. The order API consumes that topic for its
//! `/stats` endpoint. Each start replays the whole `orders` topic and counts
//! every order id once.
//!
//! ```text
//! "orders" ─► EventConsumer ─► StatsAggregator ─► publish("order-stats", key "global")
//! ```

#![forbid(unsafe_code)]

pub mod aggregator;
pub mod config;

pub use aggregator::{AggregateError, Aggregated, STATS_KEY, StatsAggregator};
pub use config::AggregatorConfig;
