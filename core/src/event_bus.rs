//! Broker access.
//!
//! ```text
//! POST /orders ──► publish("orders") ──► stats aggregator ──► publish("order-stats")
//!                                                                    │
//!                               StatsCache ◄── subscribe("order-stats")
//! ```
//!
//! Orders reach the broker only after the database accepted them. Delivery is
//! at-least-once and ordered per key, so subscribers must tolerate repeats.
//! `InMemoryEventBus` (order-stream-testing) and `RedpandaEventBus`
//! (order-stream-redpanda) implement [`EventBus`].

use crate::event::EventRecord;
use futures::Stream;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Why a broker operation failed.
#[derive(Error, Debug, Clone)]
pub enum EventBusError {
    /// The client could not be created or reach the brokers.
    #[error("broker unreachable: {0}")]
    ConnectionFailed(String),

    /// The broker did not acknowledge a record.
    #[error("could not publish to {topic}: {reason}")]
    PublishFailed {
        /// Destination topic
        topic: String,
        /// Broker or client error text
        reason: String,
    },

    /// Joining the consumer group or subscribing was refused.
    #[error("could not subscribe to {}: {reason}", topics.join(", "))]
    SubscriptionFailed {
        /// Requested topics
        topics: Vec<String>,
        /// Broker or client error text
        reason: String,
    },

    /// A delivered message is not a usable record, e.g. it has no payload.
    #[error("unusable message: {0}")]
    InvalidMessage(String),

    /// Receiving failed mid-subscription.
    #[error("broker transport: {0}")]
    TransportError(String),
}

/// Records delivered to one subscription, in arrival order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventRecord, EventBusError>> + Send>>;

/// Publish and subscribe on named topics.
///
/// Boxed futures keep the trait object-safe: the HTTP state and the stats
/// consumer share a single `Arc<dyn EventBus>`.
pub trait EventBus: Send + Sync {
    /// Send `record` to `topic`, resolving once the broker acknowledged it.
    ///
    /// # Errors
    ///
    /// [`EventBusError::PublishFailed`] when the broker rejects or times out.
    fn publish(
        &self,
        topic: &str,
        record: &EventRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>>;

    /// Start receiving records from `topics`.
    ///
    /// Dropping the stream ends the subscription.
    ///
    /// # Errors
    ///
    /// [`EventBusError::SubscriptionFailed`] when the subscription cannot be set up.
    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_name_the_topics() {
        let err = EventBusError::SubscriptionFailed {
            topics: vec!["orders".to_string(), "order-stats".to_string()],
            reason: "group coordinator unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "could not subscribe to orders, order-stats: group coordinator unavailable"
        );

        let err = EventBusError::PublishFailed {
            topic: "orders".to_string(),
            reason: "timed out".to_string(),
        };
        assert_eq!(err.to_string(), "could not publish to orders: timed out");
    }
}
