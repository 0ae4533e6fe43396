//! Outbound order events.

use order_stream_core::{EventBus, EventBusError, EventError, EventRecord, Order};
use std::sync::Arc;
use thiserror::Error;

/// Errors from [`OrderPublisher::publish`].
#[derive(Error, Debug)]
pub enum PublishError {
    /// The order could not be encoded.
    #[error(transparent)]
    Encode(#[from] EventError),

    /// The broker rejected the record.
    #[error(transparent)]
    Bus(#[from] EventBusError),
}

/// Publishes created orders to the orders topic.
///
/// Each record is keyed by `order_id`, carries the order as JSON and is
/// timestamped with `created_at`. The underlying producer is created once,
/// when the event bus is built, and shared by every request.
#[derive(Clone)]
pub struct OrderPublisher {
    event_bus: Arc<dyn EventBus>,
    topic: String,
}

impl OrderPublisher {
    /// Publish to `topic` through `event_bus`.
    #[must_use]
    pub fn new(event_bus: Arc<dyn EventBus>, topic: impl Into<String>) -> Self {
        Self {
            event_bus,
            topic: topic.into(),
        }
    }

    /// Destination topic.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Send `order` to the broker.
    ///
    /// # Errors
    ///
    /// Returns [`PublishError`] if encoding or the broker send fails.
    pub async fn publish(&self, order: &Order) -> Result<(), PublishError> {
        let record = EventRecord::json(
            Some(order.order_id.to_string()),
            order,
            Some(order.created_at),
        )?;

        self.event_bus.publish(&self.topic, &record).await?;

        tracing::debug!(
            topic = %self.topic,
            order_id = %order.order_id,
            "Order published"
        );
        Ok(())
    }
}
