//! Aggregate order statistics.
//!
//! Two views of the same `order-stats` document:
//!
//! - [`StatsDocument`] is the mapping exactly as the producer sent it. The
//!   cache and the dashboard log hold this, so fields are never dropped,
//!   invented or rejected for their type.
//! - [`OrderStats`] is the typed running total the aggregator folds orders
//!   into. Keys are camelCase on the wire:
//!
//! ```json
//! {
//!   "totalOrders": 3,
//!   "totalSales": 45000.0,
//!   "byRegion": { "Seoul": { "orders": 2, "sales": 30000.0 } }
//! }
//! ```

use crate::order::Order;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value, json};
use std::collections::BTreeMap;

/// A count from a JSON number: integers, or floats with no fractional part.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count_from(number: &Number) -> Option<u64> {
    if let Some(n) = number.as_u64() {
        return Some(n);
    }
    let f = number.as_f64()?;
    if f < 0.0 || f.fract() != 0.0 || f >= 18_446_744_073_709_551_616.0 {
        return None;
    }
    Some(f as u64)
}

/// `null` or absent counts as zero; `3.0` counts as 3.
fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    match Option::<Number>::deserialize(deserializer)? {
        None => Ok(0),
        Some(number) => count_from(&number)
            .ok_or_else(|| serde::de::Error::custom(format!("{number} is not a count"))),
    }
}

/// `null` or absent sums to zero.
fn lenient_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Per-region running totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    /// Number of orders seen for the region.
    #[serde(default, deserialize_with = "lenient_count")]
    pub orders: u64,
    /// Sum of order prices for the region.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub sales: f64,
    /// Other per-region fields, e.g. an average price.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Running totals across all orders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    /// Number of orders aggregated.
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_orders: u64,

    /// Sum of all order prices.
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_sales: f64,

    /// Totals broken down by region label.
    #[serde(default)]
    pub by_region: BTreeMap<String, RegionStats>,

    /// Start of the aggregation window, if the producer windows its totals.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_start: Option<String>,

    /// End of the aggregation window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_end: Option<String>,

    /// Unrecognized fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OrderStats {
    /// Fold one order into the running totals.
    ///
    /// Orders with a blank region are ignored. Returns whether the totals
    /// changed.
    pub fn apply(&mut self, order: &Order) -> bool {
        let region = order.region.trim();
        if region.is_empty() {
            return false;
        }

        let price = order.price.to_f64().unwrap_or_default();

        self.total_orders += 1;
        self.total_sales += price;

        let entry = self.by_region.entry(region.to_string()).or_default();
        entry.orders += 1;
        entry.sales += price;

        true
    }
}

/// A stats message as received: any JSON object, kept field for field.
///
/// Anything that is not an object (a number, a list, invalid JSON) fails to
/// decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatsDocument(Map<String, Value>);

impl StatsDocument {
    /// Wrap an already decoded object.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// All fields.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Drop `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// `totalOrders`, when it is a whole non-negative number.
    #[must_use]
    pub fn total_orders(&self) -> Option<u64> {
        match self.0.get("totalOrders")? {
            Value::Number(n) => count_from(n),
            _ => None,
        }
    }

    /// `totalSales`, when it is a number.
    #[must_use]
    pub fn total_sales(&self) -> Option<f64> {
        self.0.get("totalSales")?.as_f64()
    }

    /// Number of entries in `byRegion`, when it is an object.
    #[must_use]
    pub fn region_count(&self) -> Option<usize> {
        self.0.get("byRegion")?.as_object().map(Map::len)
    }
}

/// Zero counters and no regions: what `/stats` shows before the first update.
impl Default for StatsDocument {
    fn default() -> Self {
        let mut fields = Map::new();
        fields.insert("totalOrders".to_string(), json!(0));
        fields.insert("totalSales".to_string(), json!(0.0));
        fields.insert("byRegion".to_string(), json!({}));
        Self(fields)
    }
}

/// The cached view of the latest [`StatsDocument`], stamped with its arrival time.
///
/// Serializes flat, with `lastUpdated` next to the stats fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    /// The most recent statistics received.
    #[serde(flatten)]
    pub stats: StatsDocument,

    /// When the statistics were received; `null` until the first update.
    pub last_updated: Option<DateTime<Utc>>,
}
