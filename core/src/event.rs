//! Broker records exchanged over the event bus.
//!
//! Every record on the `orders` and `order-stats` topics is a JSON document,
//! readable by the streams application on the other side of the topics.
//!
//! # Example
//!
//! ```
//! use order_stream_core::event::EventRecord;
//! use serde_json::json;
//!
//! let record = EventRecord::json(Some("order-1".to_string()), &json!({ "price": 10 }), None)
//!     .expect("serializable");
//! assert_eq!(record.key.as_deref(), Some("order-1"));
//!
//! let value: serde_json::Value = record.decode_json().expect("valid json");
//! assert_eq!(value["price"], 10);
//! ```

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt;
use thiserror::Error;

/// Error types for record encoding.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize a value into a record payload.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),

    /// Failed to deserialize a record payload.
    #[error("Failed to deserialize event: {0}")]
    DeserializationError(String),
}

/// A single message as it travels through the broker.
///
/// The key decides the partition (orders are keyed by `order_id`, stats by the
/// aggregation key `"global"`). The timestamp is milliseconds since the Unix
/// epoch; when absent the broker assigns one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    /// Partitioning key.
    pub key: Option<String>,

    /// JSON-encoded message body.
    pub payload: Vec<u8>,

    /// Message timestamp in milliseconds since the Unix epoch.
    pub timestamp: Option<i64>,
}

impl EventRecord {
    /// Create a record from raw parts.
    #[must_use]
    pub const fn new(key: Option<String>, payload: Vec<u8>, timestamp: Option<i64>) -> Self {
        Self {
            key,
            payload,
            timestamp,
        }
    }

    /// Encode `value` as JSON into a new record.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if `value` cannot be encoded.
    pub fn json<T: Serialize>(
        key: Option<String>,
        value: &T,
        timestamp: Option<DateTime<Utc>>,
    ) -> Result<Self, EventError> {
        let payload =
            serde_json::to_vec(value).map_err(|e| EventError::SerializationError(e.to_string()))?;
        Ok(Self::new(
            key,
            payload,
            timestamp.map(|t| t.timestamp_millis()),
        ))
    }

    /// Decode the JSON payload.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::DeserializationError`] if the payload is not valid
    /// JSON for `T`.
    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, EventError> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| EventError::DeserializationError(e.to_string()))
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EventRecord(key={}, {} bytes)",
            self.key.as_deref().unwrap_or("-"),
            self.payload.len()
        )
    }
}
