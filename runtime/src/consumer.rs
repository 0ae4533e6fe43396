//! Event bus consumer with automatic resubscription.
//!
//! `EventConsumer` owns the subscribe-process-reconnect loop so that a
//! background task only has to supply an [`EventHandler`]:
//!
//! ```text
//! loop {
//!     subscribe(topics)
//!         ok  -> process records until the stream ends or shutdown
//!         err -> log
//!     wait retry delay (interrupted by shutdown)
//! }
//! ```
//!
//! Handler failures and stream errors are logged and counted; they never stop
//! the loop. Only the shutdown signal, or running out of retries under a
//! bounded [`RetryPolicy`], ends it.
//!
//! # Example
//!
//! ```rust,ignore
//! let consumer = EventConsumer::builder()
//!     .name("stats")
//!     .topics(vec!["order-stats".to_string()])
//!     .event_bus(event_bus)
//!     .handler(Arc::new(StatsUpdateHandler::new(cache, log, clock)))
//!     .shutdown(shutdown_rx)
//!     .build()?;
//!
//! let handle = consumer.spawn();
//! ```

use crate::handler::EventHandler;
use crate::retry::RetryPolicy;
use futures::StreamExt;
use order_stream_core::event_bus::{EventBus, EventStream};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

/// Default wait between resubscription attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// How a single subscription ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamOutcome {
    Ended,
    Shutdown,
}

/// Background consumer of one or more topics.
///
/// Created through [`EventConsumer::builder`] and run with
/// [`spawn`](Self::spawn). Stops when the shutdown channel fires or its
/// sender is dropped.
pub struct EventConsumer {
    /// Consumer name (for logging and metrics)
    name: String,

    /// Topics to subscribe to
    topics: Vec<String>,

    /// Event bus to consume from
    event_bus: Arc<dyn EventBus>,

    /// Handler for processing records
    handler: Arc<dyn EventHandler>,

    /// Shutdown signal receiver
    shutdown: broadcast::Receiver<()>,

    /// Delay schedule between resubscription attempts
    retry: RetryPolicy,
}

impl EventConsumer {
    /// Create a builder for configuring a consumer.
    #[must_use]
    pub fn builder() -> EventConsumerBuilder {
        EventConsumerBuilder::default()
    }

    /// Consumer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawn the consumer as a background task.
    ///
    /// The returned handle completes once the consumer has stopped.
    #[must_use]
    pub fn spawn(mut self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the loop on the current task until shutdown.
    pub async fn run(&mut self) {
        info!(consumer = %self.name, topics = ?self.topics, "Event consumer started");

        let mut attempt = 0usize;

        loop {
            let topics: Vec<&str> = self.topics.iter().map(String::as_str).collect();

            let subscription = tokio::select! {
                _ = self.shutdown.recv() => {
                    info!(consumer = %self.name, "Event consumer received shutdown signal");
                    break;
                }
                result = self.event_bus.subscribe(&topics) => result,
            };

            match subscription {
                Ok(mut stream) => {
                    attempt = 0;
                    info!(consumer = %self.name, topics = ?self.topics, "Subscribed to event bus");

                    if self.process_stream(&mut stream).await == StreamOutcome::Shutdown {
                        break;
                    }
                }
                Err(e) => {
                    error!(consumer = %self.name, error = %e, "Failed to subscribe to event bus");
                }
            }

            if attempt >= self.retry.max_retries {
                error!(consumer = %self.name, attempt, "Giving up after repeated subscription failures");
                break;
            }

            let delay = self.retry.delay_for_attempt(attempt);
            attempt = attempt.saturating_add(1);
            metrics::counter!("order_stream_consumer_resubscribes_total", "consumer" => self.name.clone())
                .increment(1);
            warn!(consumer = %self.name, delay = ?delay, "Resubscribing after delay");

            tokio::select! {
                _ = self.shutdown.recv() => {
                    info!(consumer = %self.name, "Event consumer received shutdown signal while waiting to resubscribe");
                    break;
                }
                () = tokio::time::sleep(delay) => {}
            }
        }

        info!(consumer = %self.name, "Event consumer stopped");
    }

    /// Process records until the stream ends or shutdown is signalled.
    async fn process_stream(&mut self, stream: &mut EventStream) -> StreamOutcome {
        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    info!(consumer = %self.name, "Event consumer received shutdown signal during processing");
                    return StreamOutcome::Shutdown;
                }
                next = stream.next() => {
                    match next {
                        Some(Ok(record)) => {
                            metrics::counter!("order_stream_consumer_records_total", "consumer" => self.name.clone())
                                .increment(1);

                            if let Err(e) = self.handler.handle(&record).await {
                                metrics::counter!("order_stream_consumer_handler_errors_total", "consumer" => self.name.clone())
                                    .increment(1);
                                error!(
                                    consumer = %self.name,
                                    key = ?record.key,
                                    error = %e,
                                    "Failed to handle record"
                                );
                            }
                        }
                        Some(Err(e)) => {
                            error!(consumer = %self.name, error = %e, "Error receiving record from stream");
                        }
                        None => {
                            warn!(consumer = %self.name, "Event stream ended");
                            return StreamOutcome::Ended;
                        }
                    }
                }
            }
        }
    }
}

/// Errors from [`EventConsumerBuilder::build`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsumerBuildError {
    /// A required builder field was not set.
    #[error("Event consumer is missing required field: {0}")]
    MissingField(&'static str),
}

/// Builder for [`EventConsumer`]; name, topics, bus and handler are required.
#[derive(Default)]
pub struct EventConsumerBuilder {
    name: Option<String>,
    topics: Option<Vec<String>>,
    event_bus: Option<Arc<dyn EventBus>>,
    handler: Option<Arc<dyn EventHandler>>,
    shutdown: Option<broadcast::Receiver<()>>,
    retry: Option<RetryPolicy>,
}

impl EventConsumerBuilder {
    /// Label used in logs and metrics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Topics to read.
    #[must_use]
    pub fn topics(mut self, topics: Vec<String>) -> Self {
        self.topics = Some(topics);
        self
    }

    /// Broker to subscribe on.
    #[must_use]
    pub fn event_bus(mut self, event_bus: Arc<dyn EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Receives every record.
    #[must_use]
    pub fn handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Stops the consumer when a value arrives or the sender is dropped.
    #[must_use]
    pub fn shutdown(mut self, shutdown: broadcast::Receiver<()>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Wait a fixed `delay` between resubscription attempts, forever.
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry = Some(RetryPolicy::fixed(delay));
        self
    }

    /// Use a custom resubscription policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Build the `EventConsumer`.
    ///
    /// # Errors
    ///
    /// Returns [`ConsumerBuildError::MissingField`] if name, topics, event bus,
    /// handler or shutdown receiver was not set.
    pub fn build(self) -> Result<EventConsumer, ConsumerBuildError> {
        Ok(EventConsumer {
            name: self.name.ok_or(ConsumerBuildError::MissingField("name"))?,
            topics: self.topics.ok_or(ConsumerBuildError::MissingField("topics"))?,
            event_bus: self
                .event_bus
                .ok_or(ConsumerBuildError::MissingField("event_bus"))?,
            handler: self.handler.ok_or(ConsumerBuildError::MissingField("handler"))?,
            shutdown: self
                .shutdown
                .ok_or(ConsumerBuildError::MissingField("shutdown"))?,
            retry: self
                .retry
                .unwrap_or_else(|| RetryPolicy::fixed(DEFAULT_RETRY_DELAY)),
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::handler::HandlerError;
    use async_trait::async_trait;
    use order_stream_core::EventRecord;
    use order_stream_testing::InMemoryEventBus;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<serde_json::Value>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle(&self, record: &EventRecord) -> Result<(), HandlerError> {
            let value: serde_json::Value = record.decode_json()?;
            self.seen.lock().unwrap().push(value);
            Ok(())
        }
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not met in time");
    }

    fn record(body: &str) -> EventRecord {
        EventRecord::new(None, body.as_bytes().to_vec(), None)
    }

    #[test]
    fn build_reports_missing_fields() {
        let err = EventConsumer::builder().name("x").build().err();
        assert_eq!(err, Some(ConsumerBuildError::MissingField("topics")));
    }

    #[tokio::test]
    async fn delivers_records_and_survives_handler_errors() {
        let bus = Arc::new(InMemoryEventBus::new());
        let handler = Arc::new(RecordingHandler::default());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let consumer = EventConsumer::builder()
            .name("test")
            .topics(vec!["order-stats".to_string()])
            .event_bus(bus.clone())
            .handler(handler.clone())
            .shutdown(shutdown_rx)
            .build()
            .expect("complete builder");
        let handle = consumer.spawn();

        wait_for(|| bus.subscriber_count() == 1).await;

        bus.publish("order-stats", &record(r#"{"n":1}"#)).await.unwrap();
        bus.publish("order-stats", &record("not json")).await.unwrap();
        bus.publish("orders", &record(r#"{"n":99}"#)).await.unwrap();
        bus.publish("order-stats", &record(r#"{"n":2}"#)).await.unwrap();

        wait_for(|| handler.seen.lock().unwrap().len() == 2).await;
        let seen = handler.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![serde_json::json!({"n":1}), serde_json::json!({"n":2})]);

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("consumer stops")
            .expect("task completes");
    }

    #[tokio::test]
    async fn resubscribes_after_failure_and_stream_end() {
        let bus = Arc::new(InMemoryEventBus::new());
        bus.fail_next_subscriptions(1);
        let handler = Arc::new(RecordingHandler::default());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let handle = EventConsumer::builder()
            .name("test")
            .topics(vec!["order-stats".to_string()])
            .event_bus(bus.clone())
            .handler(handler.clone())
            .shutdown(shutdown_rx)
            .retry_delay(Duration::from_millis(10))
            .build()
            .expect("complete builder")
            .spawn();

        wait_for(|| bus.subscriber_count() == 1).await;
        assert_eq!(bus.subscribe_attempts(), 2);

        bus.close_subscriptions();
        wait_for(|| bus.subscribe_attempts() == 3 && bus.subscriber_count() == 1).await;

        bus.publish("order-stats", &record(r#"{"after":"reconnect"}"#))
            .await
            .unwrap();
        wait_for(|| handler.seen.lock().unwrap().len() == 1).await;

        drop(shutdown_tx);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("consumer stops when sender is dropped")
            .expect("task completes");
    }

    #[tokio::test]
    async fn bounded_policy_gives_up() {
        let bus = Arc::new(InMemoryEventBus::new());
        bus.fail_next_subscriptions(usize::MAX);
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let mut consumer = EventConsumer::builder()
            .name("test")
            .topics(vec!["order-stats".to_string()])
            .event_bus(bus.clone())
            .handler(Arc::new(RecordingHandler::default()))
            .shutdown(shutdown_rx)
            .retry_policy(
                RetryPolicy::builder()
                    .max_retries(2)
                    .initial_delay(Duration::from_millis(1))
                    .build(),
            )
            .build()
            .expect("complete builder");

        tokio::time::timeout(Duration::from_secs(1), consumer.run())
            .await
            .expect("consumer gives up");
        assert_eq!(bus.subscribe_attempts(), 3);
    }
}
