//! Orders accepted by the ingress API.
//!
//! An [`Order`] is created exactly once, from a validated [`NewOrder`], and is
//! never mutated afterwards. Its identifier is assigned at creation time.
//!
//! # Wire format
//!
//! Orders travel as JSON with snake_case keys, a numeric `price` and an
//! RFC 3339 `created_at`:
//!
//! ```json
//! {
//!   "order_id": "6f1c…",
//!   "user_id": "user-1",
//!   "store_id": "store-7",
//!   "region": "Seoul",
//!   "price": 12500.5,
//!   "status": "CREATED",
//!   "created_at": "2025-01-01T00:00:00Z"
//! }
//! ```

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Number of fractional digits stored for prices (`NUMERIC(10, 2)`).
pub const PRICE_SCALE: u32 = 2;

/// Exclusive upper bound for prices (`NUMERIC(10, 2)` holds 8 integer digits).
pub const MAX_PRICE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Errors raised while building or decoding orders.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// One or more of the required fields is missing or blank.
    #[error("Missing required fields: user_id, store_id, region, price")]
    MissingFields,

    /// The price is not a non-negative number within range.
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    /// A stored status label does not match any known status.
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}

/// Unique order identifier (UUID v4 rendered as a string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(String);

impl OrderId {
    /// Wrap an existing identifier.
    #[must_use]
    pub const fn new(id: String) -> Self {
        Self(id)
    }

    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of an order.
///
/// Orders only ever reach `CREATED` in this service; downstream systems own
/// any later transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted, persisted and published.
    Created,
}

impl OrderStatus {
    /// Database / wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
        }
    }

    /// Parse a status from its database representation.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::UnknownStatus`] if the label is not recognized.
    pub fn parse(s: &str) -> Result<Self, OrderError> {
        match s {
            "CREATED" => Ok(Self::Created),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated input for a new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    /// Customer placing the order.
    pub user_id: String,
    /// Store the order was placed at.
    pub store_id: String,
    /// Region label used for aggregation.
    pub region: String,
    /// Order total, rounded to [`PRICE_SCALE`] places.
    pub price: Decimal,
}

impl NewOrder {
    /// Validate raw fields into a `NewOrder`.
    ///
    /// Text fields are trimmed. The price is rounded half away from zero to
    /// two decimal places, matching `NUMERIC(10, 2)`.
    ///
    /// # Errors
    ///
    /// - [`OrderError::MissingFields`] if any text field is blank.
    /// - [`OrderError::InvalidPrice`] if the price is negative or too large.
    pub fn new(
        user_id: &str,
        store_id: &str,
        region: &str,
        price: Decimal,
    ) -> Result<Self, OrderError> {
        let (user_id, store_id, region) = (user_id.trim(), store_id.trim(), region.trim());
        if user_id.is_empty() || store_id.is_empty() || region.is_empty() {
            return Err(OrderError::MissingFields);
        }

        if price.is_sign_negative() && !price.is_zero() {
            return Err(OrderError::InvalidPrice(format!("{price} is negative")));
        }

        let price = price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
        if price >= MAX_PRICE {
            return Err(OrderError::InvalidPrice(format!(
                "{price} exceeds the maximum of {MAX_PRICE}"
            )));
        }

        Ok(Self {
            user_id: user_id.to_string(),
            store_id: store_id.to_string(),
            region: region.to_string(),
            price,
        })
    }
}

/// A single customer purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Identifier assigned at creation; immutable.
    pub order_id: OrderId,
    /// Customer placing the order.
    pub user_id: String,
    /// Store the order was placed at.
    pub store_id: String,
    /// Region label.
    pub region: String,
    /// Order total.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Lifecycle status.
    pub status: OrderStatus,
    /// Creation time (UTC).
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create an order with a freshly generated identifier and `CREATED` status.
    #[must_use]
    pub fn create(new_order: NewOrder, created_at: DateTime<Utc>) -> Self {
        Self::with_id(OrderId::generate(), new_order, created_at)
    }

    /// Create an order with a caller-supplied identifier.
    #[must_use]
    pub fn with_id(order_id: OrderId, new_order: NewOrder, created_at: DateTime<Utc>) -> Self {
        let NewOrder {
            user_id,
            store_id,
            region,
            price,
        } = new_order;

        Self {
            order_id,
            user_id,
            store_id,
            region,
            price,
            status: OrderStatus::Created,
            created_at,
        }
    }

    /// Creation time as milliseconds since the Unix epoch (broker timestamp).
    #[must_use]
    pub fn created_at_millis(&self) -> i64 {
        self.created_at.timestamp_millis()
    }
}
