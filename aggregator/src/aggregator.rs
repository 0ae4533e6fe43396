//! Running totals over the `orders` topic.
//!
//! Every order folds into a single global [`OrderStats`] and the updated
//! snapshot is published to the output topic under the key [`STATS_KEY`].
//! State lives in memory only. The binary reads the input topic from its first
//! record on every start and never commits offsets, so the totals are rebuilt
//! from the full history. Orders are counted once per order id: redelivered or
//! replayed records leave the totals unchanged.

use async_trait::async_trait;
use order_stream_core::{
    EventBus, EventBusError, EventError, EventRecord, Order, OrderId, OrderStats,
};
use order_stream_runtime::{EventHandler, HandlerError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Key every snapshot is published under.
pub const STATS_KEY: &str = "global";

/// Errors raised while folding an order.
#[derive(Error, Debug)]
pub enum AggregateError {
    /// The record is not an order.
    #[error("Failed to decode order: {0}")]
    Decode(#[source] EventError),

    /// The snapshot could not be encoded.
    #[error("Failed to encode stats: {0}")]
    Encode(#[source] EventError),

    /// The snapshot could not be published.
    #[error("Failed to publish stats: {0}")]
    Publish(#[from] EventBusError),
}

/// What [`StatsAggregator::aggregate`] did with an order.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregated {
    /// Counted and published; the new totals.
    Published(OrderStats),
    /// No region, nothing counted.
    NoRegion,
    /// This order id was counted before.
    AlreadyCounted,
}

#[derive(Default)]
struct Totals {
    stats: OrderStats,
    counted: HashSet<OrderId>,
}

/// Folds orders into [`OrderStats`] and publishes each new snapshot.
pub struct StatsAggregator {
    totals: Mutex<Totals>,
    event_bus: Arc<dyn EventBus>,
    output_topic: String,
}

impl StatsAggregator {
    /// Start from empty totals, publishing to `output_topic`.
    #[must_use]
    pub fn new(event_bus: Arc<dyn EventBus>, output_topic: impl Into<String>) -> Self {
        Self {
            totals: Mutex::new(Totals::default()),
            event_bus,
            output_topic: output_topic.into(),
        }
    }

    /// A copy of the running totals.
    #[must_use]
    pub fn current(&self) -> OrderStats {
        self.totals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats
            .clone()
    }

    /// Fold one order and publish the result.
    ///
    /// A failed publish leaves the order counted; the next snapshot includes it.
    ///
    /// # Errors
    ///
    /// Returns [`AggregateError`] if the record is not an order or the
    /// snapshot cannot be published.
    pub async fn aggregate(&self, record: &EventRecord) -> Result<Aggregated, AggregateError> {
        let order: Order = record.decode_json().map_err(AggregateError::Decode)?;

        let snapshot = {
            let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
            if totals.counted.contains(&order.order_id) {
                return Ok(Aggregated::AlreadyCounted);
            }
            if !totals.stats.apply(&order) {
                return Ok(Aggregated::NoRegion);
            }
            totals.counted.insert(order.order_id);
            totals.stats.clone()
        };

        let out = EventRecord::json(Some(STATS_KEY.to_string()), &snapshot, None)
            .map_err(AggregateError::Encode)?;
        self.event_bus.publish(&self.output_topic, &out).await?;

        Ok(Aggregated::Published(snapshot))
    }
}

#[async_trait]
impl EventHandler for StatsAggregator {
    async fn handle(&self, record: &EventRecord) -> Result<(), HandlerError> {
        match self.aggregate(record).await {
            Ok(Aggregated::Published(stats)) => {
                metrics::counter!("order_stream_orders_aggregated_total").increment(1);
                info!(
                    total_orders = stats.total_orders,
                    total_sales = stats.total_sales,
                    "Published stats"
                );
                Ok(())
            }
            Ok(Aggregated::NoRegion) => {
                metrics::counter!("order_stream_orders_skipped_total").increment(1);
                debug!(key = ?record.key, "Skipping order without region");
                Ok(())
            }
            Ok(Aggregated::AlreadyCounted) => {
                metrics::counter!("order_stream_orders_duplicate_total").increment(1);
                debug!(key = ?record.key, "Order already counted");
                Ok(())
            }
            Err(e) => {
                metrics::counter!("order_stream_orders_skipped_total").increment(1);
                warn!(key = ?record.key, error = %e, "Failed to aggregate order");
                Err(Box::new(e))
            }
        }
    }
}
