//! Kafka transport for the order pipeline.
//!
//! [`RedpandaEventBus`] implements [`EventBus`](order_stream_core::event_bus::EventBus)
//! with rdkafka, so it runs against Redpanda or Apache Kafka alike.
//!
//! Delivery is at-least-once: a subscription commits a record's offset only
//! once the subscriber polls for the next record, so a record whose handling
//! was cut short is delivered again. Subscriptions built with
//! `commit_offsets(false)` never commit and read from their reset position on
//! every start.
//! Records sharing a key land on one partition and keep their order.
//!
//! ```no_run
//! use futures::StreamExt;
//! use order_stream_core::event::EventRecord;
//! use order_stream_core::event_bus::EventBus;
//! use order_stream_redpanda::RedpandaEventBus;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus = RedpandaEventBus::new("localhost:9092")?;
//!
//! let order = EventRecord::new(Some("order-1".to_string()), br#"{"price":10}"#.to_vec(), None);
//! bus.publish("orders", &order).await?;
//!
//! let mut stats = bus.subscribe(&["order-stats"]).await?;
//! while let Some(record) = stats.next().await {
//!     println!("{}", record?);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bus;
mod record;
pub mod settings;

pub use bus::{RedpandaEventBus, RedpandaEventBusBuilder};
pub use settings::{KafkaSettings, OffsetReset};
