//! Last-writer-wins cell for the most recent stats snapshot.

use crate::stats::{StatsDocument, StatsSnapshot};
use chrono::{DateTime, Utc};
use std::sync::{PoisonError, RwLock};

/// Holds the latest [`StatsSnapshot`].
///
/// Starts at zero counters with `lastUpdated = null` and is shared by `Arc`
/// between the stats consumer (writer) and the HTTP handlers (readers).
#[derive(Debug, Default)]
pub struct StatsCache {
    snapshot: RwLock<StatsSnapshot>,
}

impl StatsCache {
    /// Create a cache holding the initial empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the cached snapshot with `stats`, stamped with `received_at`.
    ///
    /// A producer-sent `lastUpdated` gives way to the arrival time. Returns the
    /// snapshot that is now cached.
    pub fn replace(&self, mut stats: StatsDocument, received_at: DateTime<Utc>) -> StatsSnapshot {
        stats.remove("lastUpdated");
        let snapshot = StatsSnapshot {
            stats,
            last_updated: Some(received_at),
        };

        let mut guard = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = snapshot.clone();
        snapshot
    }

    /// A copy of the current snapshot.
    #[must_use]
    pub fn current(&self) -> StatsSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn document(value: serde_json::Value) -> StatsDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn starts_empty() {
        let cache = StatsCache::new();
        assert_eq!(cache.current(), StatsSnapshot::default());
        assert!(cache.current().last_updated.is_none());
    }

    #[test]
    fn last_writer_wins() {
        let cache = StatsCache::new();
        let first = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 5).unwrap();

        cache.replace(document(json!({"totalOrders": 1})), first);
        cache.replace(document(json!({"totalOrders": 2})), second);

        let current = cache.current();
        assert_eq!(current.stats.total_orders(), Some(2));
        assert_eq!(current.last_updated, Some(second));
    }

    #[test]
    fn replacement_adds_no_fields() {
        let cache = StatsCache::new();
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        cache.replace(document(json!({"totalOrders": 7, "totalSales": null})), at);

        let json = serde_json::to_value(cache.current()).expect("serializes");
        assert_eq!(
            json,
            json!({"totalOrders": 7, "totalSales": null, "lastUpdated": "2025-01-01T00:00:00Z"})
        );
    }

    #[test]
    fn producer_last_updated_is_overridden() {
        let cache = StatsCache::new();
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let snapshot = cache.replace(document(json!({"lastUpdated": "yesterday"})), at);

        let json = serde_json::to_value(&snapshot).expect("serializes");
        assert_eq!(json["lastUpdated"], "2025-06-01T12:00:00Z");
    }
}
