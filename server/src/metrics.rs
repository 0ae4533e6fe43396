//! Application metrics.
//!
//! Recorded through the `metrics` facade; exported by the runtime's
//! [`MetricsServer`](order_stream_runtime::MetricsServer) when `METRICS_PORT`
//! is non-zero. Without an installed recorder every call is a no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use order_stream_core::Order;
use rust_decimal::prelude::ToPrimitive;

/// Orders persisted and published.
pub const ORDERS_CREATED: &str = "order_stream_orders_created_total";
/// Order requests that failed, labelled by `stage`.
pub const ORDER_FAILURES: &str = "order_stream_order_failures_total";
/// Stats snapshots applied to the cache.
pub const STATS_UPDATES: &str = "order_stream_stats_updates_total";
/// Stats messages that could not be decoded.
pub const STATS_DECODE_FAILURES: &str = "order_stream_stats_decode_failures_total";
/// Distribution of accepted order prices.
pub const ORDER_PRICE: &str = "order_stream_order_price";

/// Where an order request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// The request body was rejected.
    Validation,
    /// The insert failed.
    Database,
    /// The broker publish failed.
    Publish,
}

impl FailureStage {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Database => "database",
            Self::Publish => "publish",
        }
    }
}

/// Register metric descriptions with the installed recorder.
pub fn describe() {
    describe_counter!(ORDERS_CREATED, "Orders persisted and published");
    describe_counter!(ORDER_FAILURES, "Order requests that failed, by stage");
    describe_counter!(STATS_UPDATES, "Stats snapshots received and cached");
    describe_counter!(
        STATS_DECODE_FAILURES,
        "Messages on the stats topic that were not valid stats JSON"
    );
    describe_histogram!(ORDER_PRICE, "Price of accepted orders");
}

/// Count a created order and record its price.
pub fn record_order_created(order: &Order) {
    counter!(ORDERS_CREATED).increment(1);
    histogram!(ORDER_PRICE).record(order.price.to_f64().unwrap_or_default());
}

/// Count a failed order request.
pub fn record_order_failure(stage: FailureStage) {
    counter!(ORDER_FAILURES, "stage" => stage.as_str()).increment(1);
}

/// Count an applied stats snapshot.
pub fn record_stats_update() {
    counter!(STATS_UPDATES).increment(1);
}

/// Count an undecodable stats message.
pub fn record_stats_decode_failure() {
    counter!(STATS_DECODE_FAILURES).increment(1);
}
