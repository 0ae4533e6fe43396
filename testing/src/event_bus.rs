//! In-memory event bus.
//!
//! Publishes fan out to live subscribers through a tokio broadcast channel and
//! are also appended to a log that tests can inspect. Subscriptions only see
//! records published after they were created, like a Kafka consumer starting
//! at the latest offset.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use order_stream_core::event::EventRecord;
use order_stream_core::event_bus::{EventBus, EventBusError, EventStream};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 1024;

/// Event bus backed by a broadcast channel.
///
/// # Example
///
/// ```
/// use order_stream_testing::InMemoryEventBus;
/// use order_stream_core::{EventBus, EventRecord};
/// use futures::StreamExt;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = InMemoryEventBus::new();
/// let mut stream = bus.subscribe(&["orders"]).await?;
///
/// bus.publish("orders", &EventRecord::new(None, b"{}".to_vec(), None)).await?;
///
/// let record = stream.next().await.expect("record")?;
/// assert_eq!(record.payload, b"{}".to_vec());
/// assert_eq!(bus.published_to("orders").len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct InMemoryEventBus {
    sender: Mutex<broadcast::Sender<(String, EventRecord)>>,
    published: Mutex<Vec<(String, EventRecord)>>,
    fail_publish: AtomicBool,
    failing_subscriptions: AtomicUsize,
    subscribe_attempts: AtomicUsize,
}

impl InMemoryEventBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender: Mutex::new(sender),
            published: Mutex::new(Vec::new()),
            fail_publish: AtomicBool::new(false),
            failing_subscriptions: AtomicUsize::new(0),
            subscribe_attempts: AtomicUsize::new(0),
        }
    }

    /// Every `(topic, record)` published so far, oldest first.
    #[must_use]
    pub fn published(&self) -> Vec<(String, EventRecord)> {
        self.published.lock().unwrap().clone()
    }

    /// Records published to `topic`, oldest first.
    #[must_use]
    pub fn published_to(&self, topic: &str) -> Vec<EventRecord> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// Make every following publish fail (or succeed again).
    pub fn set_fail_publish(&self, fail: bool) {
        self.fail_publish.store(fail, Ordering::SeqCst);
    }

    /// Make the next `count` subscribe calls fail.
    pub fn fail_next_subscriptions(&self, count: usize) {
        self.failing_subscriptions.store(count, Ordering::SeqCst);
    }

    /// Number of subscribe calls made so far, including failed ones.
    #[must_use]
    pub fn subscribe_attempts(&self) -> usize {
        self.subscribe_attempts.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.lock().unwrap().receiver_count()
    }

    /// End every live subscription stream, as a broker disconnect would.
    ///
    /// Later subscriptions work normally.
    pub fn close_subscriptions(&self) {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        *self.sender.lock().unwrap() = sender;
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for InMemoryEventBus {
    fn publish(
        &self,
        topic: &str,
        record: &EventRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let record = record.clone();

        Box::pin(async move {
            if self.fail_publish.load(Ordering::SeqCst) {
                return Err(EventBusError::PublishFailed {
                    topic,
                    reason: "broker unavailable".to_string(),
                });
            }

            self.published
                .lock()
                .unwrap()
                .push((topic.clone(), record.clone()));

            // No live subscribers is not an error.
            let _ = self.sender.lock().unwrap().send((topic, record));
            Ok(())
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|t| (*t).to_string()).collect();

        self.subscribe_attempts.fetch_add(1, Ordering::SeqCst);
        let fail = self
            .failing_subscriptions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();

        let receiver = (!fail).then(|| self.sender.lock().unwrap().subscribe());

        Box::pin(async move {
            let Some(mut receiver) = receiver else {
                return Err(EventBusError::SubscriptionFailed {
                    topics,
                    reason: "broker unavailable".to_string(),
                });
            };

            let stream = async_stream::stream! {
                loop {
                    match receiver.recv().await {
                        Ok((topic, record)) => {
                            if topics.contains(&topic) {
                                yield Ok(record);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            yield Err(EventBusError::TransportError(format!(
                                "subscriber lagged, {skipped} records skipped"
                            )));
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            };

            Ok(Box::pin(stream) as EventStream)
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn record(key: &str) -> EventRecord {
        EventRecord::new(Some(key.to_string()), b"{}".to_vec(), Some(1))
    }

    #[tokio::test]
    async fn subscribers_only_see_their_topics() {
        let bus = InMemoryEventBus::new();
        let mut stream = bus.subscribe(&["order-stats"]).await.expect("subscribed");

        bus.publish("orders", &record("a")).await.expect("published");
        bus.publish("order-stats", &record("global")).await.expect("published");

        let received = stream.next().await.expect("record").expect("ok");
        assert_eq!(received.key.as_deref(), Some("global"));
        assert_eq!(bus.published().len(), 2);
        assert_eq!(bus.published_to("orders"), vec![record("a")]);
    }

    #[tokio::test]
    async fn publish_failure_is_not_recorded() {
        let bus = InMemoryEventBus::new();
        bus.set_fail_publish(true);

        let result = bus.publish("orders", &record("a")).await;
        assert!(matches!(result, Err(EventBusError::PublishFailed { .. })));
        assert!(bus.published().is_empty());
    }

    #[tokio::test]
    async fn injected_subscription_failures_are_consumed() {
        let bus = InMemoryEventBus::new();
        bus.fail_next_subscriptions(1);

        assert!(bus.subscribe(&["orders"]).await.is_err());
        assert!(bus.subscribe(&["orders"]).await.is_ok());
        assert_eq!(bus.subscribe_attempts(), 2);
    }

    #[tokio::test]
    async fn close_ends_live_streams() {
        let bus = InMemoryEventBus::new();
        let mut stream = bus.subscribe(&["orders"]).await.expect("subscribed");
        assert_eq!(bus.subscriber_count(), 1);

        bus.close_subscriptions();
        assert!(stream.next().await.is_none());
        assert_eq!(bus.subscriber_count(), 0);
    }
}
