//! Event handlers run by the server's background consumers.

use crate::metrics;
use async_trait::async_trait;
use order_stream_core::environment::Clock;
use order_stream_core::{EventLog, EventRecord, LogEntry, LogStream, StatsCache, StatsDocument};
use order_stream_runtime::{EventHandler, HandlerError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Applies `order-stats` messages to the stats cache and the dashboard log.
///
/// Any JSON object is accepted and cached as sent. A message that is not a
/// JSON object is counted, logged and skipped; the consumer keeps running.
pub struct StatsUpdateHandler {
    cache: Arc<StatsCache>,
    event_log: Arc<EventLog>,
    clock: Arc<dyn Clock>,
}

impl StatsUpdateHandler {
    /// Create a handler writing to `cache` and `event_log`, stamping entries with `clock`.
    #[must_use]
    pub fn new(cache: Arc<StatsCache>, event_log: Arc<EventLog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            cache,
            event_log,
            clock,
        }
    }
}

#[async_trait]
impl EventHandler for StatsUpdateHandler {
    async fn handle(&self, record: &EventRecord) -> Result<(), HandlerError> {
        let stats: StatsDocument = match record.decode_json() {
            Ok(stats) => stats,
            Err(e) => {
                metrics::record_stats_decode_failure();
                warn!(key = ?record.key, error = %e, "Skipping malformed stats message");
                return Err(Box::new(e));
            }
        };

        let received_at = self.clock.now();
        let snapshot = self.cache.replace(stats, received_at);
        self.event_log.record(
            LogStream::Stats,
            LogEntry::stats_update(snapshot.stats.clone(), received_at),
        );
        metrics::record_stats_update();

        debug!(
            total_orders = snapshot.stats.total_orders(),
            total_sales = snapshot.stats.total_sales(),
            regions = snapshot.stats.region_count(),
            "Stats updated"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use order_stream_core::LogPayload;
    use order_stream_testing::test_clock;
    use serde_json::json;

    fn handler() -> (StatsUpdateHandler, Arc<StatsCache>, Arc<EventLog>) {
        let cache = Arc::new(StatsCache::new());
        let log = Arc::new(EventLog::new(50));
        let handler = StatsUpdateHandler::new(cache.clone(), log.clone(), Arc::new(test_clock()));
        (handler, cache, log)
    }

    fn record(value: &serde_json::Value) -> EventRecord {
        EventRecord::json(Some("global".to_string()), value, None).unwrap()
    }

    #[tokio::test]
    async fn stats_message_updates_cache_and_log() {
        let (handler, cache, log) = handler();

        handler
            .handle(&record(&json!({
                "totalOrders": 2,
                "totalSales": 30.5,
                "byRegion": {"Seoul": {"orders": 2, "sales": 30.5}}
            })))
            .await
            .expect("handled");

        let snapshot = cache.current();
        assert_eq!(snapshot.stats.total_orders(), Some(2));
        assert_eq!(snapshot.stats.total_sales(), Some(30.5));
        assert_eq!(snapshot.last_updated, Some(test_clock().now()));

        let entries = log.read(LogStream::Stats, 20);
        assert_eq!(entries.len(), 1);
        assert!(matches!(&entries[0].payload, LogPayload::Stats(s) if s.total_orders() == Some(2)));
    }

    #[tokio::test]
    async fn malformed_message_is_skipped() {
        let (handler, cache, log) = handler();

        let garbage = EventRecord::new(None, b"not json".to_vec(), None);
        assert!(handler.handle(&garbage).await.is_err());

        assert_eq!(cache.current().last_updated, None);
        assert_eq!(log.len(LogStream::Stats), 0);
    }

    #[tokio::test]
    async fn loosely_typed_mapping_is_cached_as_sent() {
        let (handler, cache, log) = handler();
        let sent = json!({
            "totalOrders": 3.0,
            "totalSales": null,
            "byRegion": {"Seoul": {"orders": 3, "sales": 9.0, "avgPrice": 3.0}}
        });

        handler.handle(&record(&sent)).await.expect("handled");

        let cached = serde_json::to_value(&cache.current().stats).unwrap();
        assert_eq!(cached, sent);
        assert_eq!(log.len(LogStream::Stats), 1);
    }

    #[tokio::test]
    async fn non_object_message_is_skipped() {
        let (handler, cache, _) = handler();

        assert!(handler.handle(&record(&json!([1, 2, 3]))).await.is_err());
        assert_eq!(cache.current().last_updated, None);
    }

    #[tokio::test]
    async fn later_snapshot_wins() {
        let (handler, cache, log) = handler();

        handler.handle(&record(&json!({"totalOrders": 1}))).await.expect("first");
        handler.handle(&record(&json!({"totalOrders": 5}))).await.expect("second");

        assert_eq!(cache.current().stats.total_orders(), Some(5));
        let totals: Vec<Option<u64>> = log
            .read(LogStream::Stats, 20)
            .into_iter()
            .map(|entry| match entry.payload {
                LogPayload::Stats(stats) => stats.total_orders(),
                LogPayload::Order(_) => unreachable!(),
            })
            .collect();
        assert_eq!(totals, vec![Some(5), Some(1)]);
    }
}
