//! `PostgreSQL` order store for order-stream.
//!
//! [`PostgresOrderStore`] implements [`OrderRepository`] on top of a sqlx
//! connection pool. The schema is created on startup by
//! [`OrderRepository::initialize`]:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS orders (
//!     order_id   VARCHAR(255) PRIMARY KEY,
//!     user_id    VARCHAR(255) NOT NULL,
//!     store_id   VARCHAR(255) NOT NULL,
//!     region     VARCHAR(100) NOT NULL,
//!     price      NUMERIC(10, 2) NOT NULL,
//!     status     VARCHAR(50) NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL DEFAULT now()
//! );
//! ```
//!
//! # Example
//!
//! ```ignore
//! use order_stream_postgres::PostgresOrderStore;
//! use order_stream_core::OrderRepository;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PostgresOrderStore::connect("postgres://localhost/orders_db", 10, Duration::from_secs(30)).await?;
//!     store.initialize().await?;
//!     let latest = store.recent(100).await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::{DateTime, Utc};
use order_stream_core::order::{Order, OrderId, OrderStatus};
use order_stream_core::repository::{OrderRepository, RepositoryError};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const CREATE_TABLE: &str = r"
    CREATE TABLE IF NOT EXISTS orders (
        order_id VARCHAR(255) PRIMARY KEY,
        user_id VARCHAR(255) NOT NULL,
        store_id VARCHAR(255) NOT NULL,
        region VARCHAR(100) NOT NULL,
        price NUMERIC(10, 2) NOT NULL,
        status VARCHAR(50) NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
";

const CREATE_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders (created_at DESC)";

/// A row of the `orders` table.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    order_id: String,
    user_id: String,
    store_id: String,
    region: String,
    price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse(&row.status)
            .map_err(|e| RepositoryError::InvalidRow(e.to_string()))?;

        Ok(Self {
            order_id: OrderId::new(row.order_id),
            user_id: row.user_id,
            store_id: row.store_id,
            region: row.region,
            price: row.price,
            status,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL`-backed [`OrderRepository`].
#[derive(Debug, Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Connect a new pool.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ConnectionFailed`] if no connection can be
    /// established within `connect_timeout`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, RepositoryError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(format!("Failed to connect: {e}")))?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl OrderRepository for PostgresOrderStore {
    fn initialize(&self) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>> {
        Box::pin(async move {
            sqlx::query(CREATE_TABLE)
                .execute(&self.pool)
                .await
                .map_err(|e| RepositoryError::QueryFailed(format!("Failed to create orders table: {e}")))?;

            sqlx::query(CREATE_INDEX)
                .execute(&self.pool)
                .await
                .map_err(|e| RepositoryError::QueryFailed(format!("Failed to create orders index: {e}")))?;

            tracing::info!("Database schema initialized");
            Ok(())
        })
    }

    fn insert(
        &self,
        order: &Order,
    ) -> Pin<Box<dyn Future<Output = Result<Order, RepositoryError>> + Send + '_>> {
        let order = order.clone();
        Box::pin(async move {
            let row: OrderRow = sqlx::query_as(
                r"
                INSERT INTO orders (order_id, user_id, store_id, region, price, status, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING order_id, user_id, store_id, region, price, status, created_at
                ",
            )
            .bind(order.order_id.as_str())
            .bind(&order.user_id)
            .bind(&order.store_id)
            .bind(&order.region)
            .bind(order.price)
            .bind(order.status.as_str())
            .bind(order.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(format!("Failed to insert order: {e}")))?;

            tracing::debug!(order_id = %order.order_id, "Order inserted");
            Order::try_from(row)
        })
    }

    fn recent(
        &self,
        limit: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Order>, RepositoryError>> + Send + '_>> {
        Box::pin(async move {
            let rows: Vec<OrderRow> = sqlx::query_as(
                r"
                SELECT order_id, user_id, store_id, region, price, status, created_at
                FROM orders
                ORDER BY created_at DESC
                LIMIT $1
                ",
            )
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepositoryError::QueryFailed(format!("Failed to fetch orders: {e}")))?;

            rows.into_iter().map(Order::try_from).collect()
        })
    }

    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>> {
        Box::pin(async move {
            sqlx::query("SELECT 1")
                .execute(&self.pool)
                .await
                .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(status: &str) -> OrderRow {
        OrderRow {
            order_id: "o-1".to_string(),
            user_id: "u".to_string(),
            store_id: "s".to_string(),
            region: "Seoul".to_string(),
            price: Decimal::new(1250, 2),
            status: status.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn row_maps_to_order() {
        let order = Order::try_from(row("CREATED")).expect("valid row");
        assert_eq!(order.order_id.as_str(), "o-1");
        assert_eq!(order.status, OrderStatus::Created);
        assert_eq!(order.price, Decimal::new(1250, 2));
    }

    #[test]
    fn unknown_status_is_an_invalid_row() {
        let err = Order::try_from(row("SHIPPED")).unwrap_err();
        assert!(matches!(err, RepositoryError::InvalidRow(_)));
    }
}
