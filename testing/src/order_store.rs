//! In-memory order store for fast, deterministic testing.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use order_stream_core::order::Order;
use order_stream_core::repository::{OrderRepository, RepositoryError};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// `Vec`-backed [`OrderRepository`].
///
/// Listing sorts by `created_at` descending, matching the SQL store. Inserts
/// and reads can be made to fail independently to exercise error paths.
///
/// # Example
///
/// ```
/// use order_stream_testing::InMemoryOrderStore;
/// use order_stream_core::OrderRepository;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = InMemoryOrderStore::new();
/// store.initialize().await?;
/// assert!(store.recent(10).await?.is_empty());
///
/// store.set_fail_inserts(true);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<Vec<Order>>>,
    fail_inserts: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl InMemoryOrderStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored orders in insertion order.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.orders.read().unwrap().clone()
    }

    /// Number of stored orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.read().unwrap().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.read().unwrap().is_empty()
    }

    /// Make inserts fail (or succeed again).
    pub fn set_fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    /// Make reads and pings fail (or succeed again).
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), RepositoryError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(RepositoryError::ConnectionFailed(
                "connection refused".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl OrderRepository for InMemoryOrderStore {
    fn initialize(&self) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>> {
        Box::pin(async move { self.check_reads() })
    }

    fn insert(
        &self,
        order: &Order,
    ) -> Pin<Box<dyn Future<Output = Result<Order, RepositoryError>> + Send + '_>> {
        let order = order.clone();
        Box::pin(async move {
            if self.fail_inserts.load(Ordering::SeqCst) {
                return Err(RepositoryError::QueryFailed(
                    "insert rejected".to_string(),
                ));
            }

            let mut orders = self.orders.write().unwrap();
            if orders.iter().any(|o| o.order_id == order.order_id) {
                return Err(RepositoryError::QueryFailed(format!(
                    "duplicate key value violates unique constraint: order_id={}",
                    order.order_id
                )));
            }
            orders.push(order.clone());
            Ok(order)
        })
    }

    fn recent(
        &self,
        limit: u32,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Order>, RepositoryError>> + Send + '_>> {
        Box::pin(async move {
            self.check_reads()?;

            let mut orders = self.orders.read().unwrap().clone();
            // Reversed first so that, on equal timestamps, later inserts come first.
            orders.reverse();
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            orders.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(orders)
        })
    }

    fn ping(&self) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + '_>> {
        Box::pin(async move { self.check_reads() })
    }
}
