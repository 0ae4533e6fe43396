//! Order persistence abstraction.
//!
//! The relational store is the source of truth for orders: an order is
//! inserted before it is published, and the listing endpoint reads straight
//! from it.
//!
//! # Implementations
//!
//! - `PostgresOrderStore` in `order-stream-postgres`
//! - `InMemoryOrderStore` in `order-stream-testing`

use crate::order::Order;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors that can occur while talking to the order store.
#[derive(Error, Debug, Clone)]
pub enum RepositoryError {
    /// Could not reach the database.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A statement failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A stored row could not be mapped back to an [`Order`].
    #[error("Invalid row: {0}")]
    InvalidRow(String),
}

/// Persistent storage for orders.
///
/// Methods return boxed futures so the store can be held as
/// `Arc<dyn OrderRepository>`.
pub trait OrderRepository: Send + Sync {
    /// Create the `orders` table and its index if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the schema cannot be created.
    fn initialize(&self) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>>;

    /// Insert a new order and return the row as stored.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::QueryFailed`] if the insert fails, including
    /// when the identifier already exists.
    fn insert(
        &self,
        order: &Order,
    ) -> Pin<Box<dyn Future<Output = Result<Order, RepositoryError>> + Send + '_>>;

    /// The `limit` most recent orders by creation time, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the query fails or a row is malformed.
    fn recent(
        &self,
        limit: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Order>, RepositoryError>> + Send + '_>>;

    /// Check that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError`] if the store does not answer.
    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>>;
}
