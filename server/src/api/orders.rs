//! Order endpoints.
//!
//! - `POST /orders`: validate, persist, publish, record in the dashboard log
//! - `GET /orders?limit=N`: most recent orders, newest first

use crate::metrics::{self, FailureStage};
use crate::server::state::AppState;
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
};
use order_stream_core::{LogEntry, LogStream, NewOrder, Order, OrderError};
use order_stream_web::{AppError, CorrelationId, WebResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

/// Orders returned by `GET /orders` when no usable `limit` is given.
pub const DEFAULT_LIST_LIMIT: u32 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Price as sent by clients: a JSON number or a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    /// `"price": 12500.5`
    Number(serde_json::Number),
    /// `"price": "12500.50"`
    Text(String),
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrderRequest {
    /// Customer placing the order
    #[serde(default)]
    pub user_id: Option<String>,
    /// Store the order was placed at
    #[serde(default)]
    pub store_id: Option<String>,
    /// Region label
    #[serde(default)]
    pub region: Option<String>,
    /// Order total
    #[serde(default)]
    pub price: Option<PriceInput>,
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

impl CreateOrderRequest {
    /// Check the request and turn it into a [`NewOrder`].
    ///
    /// # Errors
    ///
    /// - [`OrderError::MissingFields`] if a field is absent or blank.
    /// - [`OrderError::InvalidPrice`] if the price is not a number or is out of range.
    pub fn validate(self) -> Result<NewOrder, OrderError> {
        let (Some(user_id), Some(store_id), Some(region), Some(price)) =
            (self.user_id, self.store_id, self.region, self.price)
        else {
            return Err(OrderError::MissingFields);
        };

        let price = match price {
            PriceInput::Number(n) => parse_decimal(&n.to_string())
                .ok_or_else(|| OrderError::InvalidPrice(format!("{n} is not a valid amount")))?,
            PriceInput::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Err(OrderError::MissingFields);
                }
                parse_decimal(s)
                    .ok_or_else(|| OrderError::InvalidPrice(format!("{s:?} is not a number")))?
            }
        };

        NewOrder::new(&user_id, &store_id, &region, price)
    }
}

/// Response of `POST /orders`.
#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    /// Always `true`
    pub success: bool,
    /// The stored order
    pub order: Order,
}

/// Query of `GET /orders`.
#[derive(Debug, Default, Deserialize)]
pub struct ListOrdersQuery {
    /// Maximum number of orders; kept as text so bad values fall back to the default
    pub limit: Option<String>,
}

impl ListOrdersQuery {
    /// The effective limit: a positive integer, or [`DEFAULT_LIST_LIMIT`].
    #[must_use]
    pub fn limit(&self) -> u32 {
        self.limit
            .as_deref()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

/// Response of `GET /orders`.
#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    /// Always `true`
    pub success: bool,
    /// Number of orders returned
    pub count: usize,
    /// Orders, newest first
    pub orders: Vec<Order>,
}

fn validation_error(err: &OrderError) -> AppError {
    match err {
        OrderError::MissingFields => AppError::bad_request(
            err.to_string(),
            "user_id, store_id and region must be non-empty strings and price must be present",
        ),
        OrderError::InvalidPrice(detail) => AppError::bad_request("Invalid price", detail.clone()),
        OrderError::UnknownStatus(_) => AppError::internal("Failed to create order", err.to_string()),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Create an order.
///
/// The order is persisted first and then published; it is recorded in the
/// `kstream` view only after both succeed.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/orders \
///   -H "Content-Type: application/json" \
///   -d '{"user_id":"user-1","store_id":"store-7","region":"Seoul","price":12500}'
/// ```
///
/// # Errors
///
/// - 400 for a malformed body, missing fields or an invalid price
/// - 500 if the insert or the publish fails
pub async fn create_order(
    State(state): State<AppState>,
    correlation_id: CorrelationId,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> WebResult<(StatusCode, Json<CreateOrderResponse>)> {
    let Json(request) = payload.inspect_err(|_| metrics::record_order_failure(FailureStage::Validation))?;

    let new_order = request.validate().map_err(|e| {
        metrics::record_order_failure(FailureStage::Validation);
        validation_error(&e)
    })?;

    let order = Order::create(new_order, state.clock.now());

    let stored = state.repository.insert(&order).await.map_err(|e| {
        metrics::record_order_failure(FailureStage::Database);
        AppError::internal("Failed to create order", e.to_string())
    })?;

    state.publisher.publish(&stored).await.map_err(|e| {
        metrics::record_order_failure(FailureStage::Publish);
        AppError::internal("Failed to create order", e.to_string())
    })?;

    state
        .event_log
        .record(LogStream::Orders, LogEntry::produced(stored.clone(), state.clock.now()));
    metrics::record_order_created(&stored);

    info!(
        correlation_id = %correlation_id,
        order_id = %stored.order_id,
        region = %stored.region,
        price = %stored.price,
        "Order created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateOrderResponse {
            success: true,
            order: stored,
        }),
    ))
}

/// List the most recent orders.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/orders?limit=10
/// ```
///
/// # Errors
///
/// 500 if the store cannot be read.
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> WebResult<Json<ListOrdersResponse>> {
    let orders = state
        .repository
        .recent(query.limit())
        .await
        .map_err(|e| AppError::internal("Failed to fetch orders", e.to_string()))?;

    Ok(Json(ListOrdersResponse {
        success: true,
        count: orders.len(),
        orders,
    }))
}
