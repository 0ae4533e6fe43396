//! Bounded in-memory activity log for the dashboard.
//!
//! Two independent streams are kept, each newest first:
//!
//! | Stream | Exposed as | Contents |
//! |---|---|---|
//! | [`LogStream::Orders`] | `kstream` | orders as they are published |
//! | [`LogStream::Stats`] | `ktable` | stats snapshots as they arrive |
//!
//! Recording prepends and evicts the oldest entry once a stream holds more
//! than its capacity. Nothing is persisted; a restart starts empty.

use crate::order::Order;
use crate::stats::StatsDocument;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Default capacity of each stream.
pub const DEFAULT_MAX_SIZE: usize = 50;

/// Default number of entries returned to the dashboard per stream.
pub const DEFAULT_VIEW_SIZE: usize = 20;

/// A newest-first sequence that never grows past its capacity.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    max_size: usize,
}

impl<T: Clone> BoundedLog<T> {
    /// Create an empty log. A capacity of zero is treated as one.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            entries: VecDeque::with_capacity(max_size),
            max_size,
        }
    }

    /// Insert `entry` at the front, dropping the oldest entry if full.
    pub fn record(&mut self, entry: T) {
        self.entries.push_front(entry);
        self.entries.truncate(self.max_size);
    }

    /// The first `n` entries, most recent first.
    #[must_use]
    pub fn read(&self, n: usize) -> Vec<T> {
        self.entries.iter().take(n).cloned().collect()
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capacity of the log.
    #[must_use]
    pub const fn max_size(&self) -> usize {
        self.max_size
    }
}

/// Which activity stream an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogStream {
    /// Orders published to the broker.
    Orders,
    /// Stats snapshots consumed from the broker.
    Stats,
}

impl LogStream {
    /// Name of the stream in the `/events` response.
    #[must_use]
    pub const fn view_name(&self) -> &'static str {
        match self {
            Self::Orders => "kstream",
            Self::Stats => "ktable",
        }
    }
}

/// Processing stage recorded with each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStage {
    /// The order was published to the `orders` topic.
    Produced,
    /// A stats snapshot was received from the `order-stats` topic.
    KtableUpdate,
}

/// What a log entry is a copy of.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogPayload {
    /// A published order.
    Order(Order),
    /// A received stats document.
    Stats(StatsDocument),
}

/// One dashboard entry: the payload fields flattened next to `timestamp` and `step`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    /// The recorded order or stats.
    #[serde(flatten)]
    pub payload: LogPayload,
    /// Display time of the entry.
    pub timestamp: DateTime<Utc>,
    /// Processing stage.
    pub step: ProcessingStage,
}

impl LogEntry {
    /// Entry for an order that was just published.
    #[must_use]
    pub const fn produced(order: Order, timestamp: DateTime<Utc>) -> Self {
        Self {
            payload: LogPayload::Order(order),
            timestamp,
            step: ProcessingStage::Produced,
        }
    }

    /// Entry for a stats snapshot that was just received.
    #[must_use]
    pub fn stats_update(mut stats: StatsDocument, timestamp: DateTime<Utc>) -> Self {
        stats.remove("timestamp");
        stats.remove("step");
        Self {
            payload: LogPayload::Stats(stats),
            timestamp,
            step: ProcessingStage::KtableUpdate,
        }
    }

    /// The stream this entry belongs in.
    #[must_use]
    pub const fn stream(&self) -> LogStream {
        match self.payload {
            LogPayload::Order(_) => LogStream::Orders,
            LogPayload::Stats(_) => LogStream::Stats,
        }
    }
}

/// The process-wide pair of activity streams.
///
/// Each stream sits behind its own mutex, held only for a single
/// [`record`](Self::record) or [`read`](Self::read).
#[derive(Debug)]
pub struct EventLog {
    orders: Mutex<BoundedLog<LogEntry>>,
    stats: Mutex<BoundedLog<LogEntry>>,
}

impl EventLog {
    /// Create both streams with capacity `max_size` (zero is treated as one).
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        Self {
            orders: Mutex::new(BoundedLog::new(max_size)),
            stats: Mutex::new(BoundedLog::new(max_size)),
        }
    }

    fn stream(&self, stream: LogStream) -> &Mutex<BoundedLog<LogEntry>> {
        match stream {
            LogStream::Orders => &self.orders,
            LogStream::Stats => &self.stats,
        }
    }

    /// Prepend `entry` to `stream`, evicting the oldest entry past capacity.
    pub fn record(&self, stream: LogStream, entry: LogEntry) {
        self.stream(stream)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(entry);
    }

    /// The `n` most recent entries of `stream`, newest first.
    #[must_use]
    pub fn read(&self, stream: LogStream, n: usize) -> Vec<LogEntry> {
        self.stream(stream)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .read(n)
    }

    /// Number of entries currently held in `stream`.
    #[must_use]
    pub fn len(&self, stream: LogStream) -> usize {
        self.stream(stream)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Capacity of each stream.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .max_size()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE)
    }
}
