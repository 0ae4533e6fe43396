//! The Kafka-backed [`EventBus`].

use crate::record::{from_kafka, to_kafka};
use crate::settings::{KafkaSettings, OffsetReset};
use order_stream_core::event::EventRecord;
use order_stream_core::event_bus::{EventBus, EventBusError, EventStream};
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::producer::FutureProducer;
use rdkafka::topic_partition_list::{Offset, TopicPartitionList};
use rdkafka::util::Timeout;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Event bus on a Kafka-protocol broker (Redpanda, Apache Kafka).
///
/// One producer is shared by every publish. Each subscription owns its
/// consumer; dropping the stream leaves the group.
///
/// With [`KafkaSettings::commit_offsets`] on, a record's offset is committed
/// once the subscriber polls past it, so a crash mid-record redelivers that
/// record (at-least-once).
pub struct RedpandaEventBus {
    producer: FutureProducer,
    settings: KafkaSettings,
}

impl RedpandaEventBus {
    /// Bus for `brokers` with default settings.
    ///
    /// # Errors
    ///
    /// [`EventBusError::ConnectionFailed`] if the producer cannot be created.
    pub fn new(brokers: &str) -> Result<Self, EventBusError> {
        Self::builder().brokers(brokers).build()
    }

    /// Start configuring a bus.
    #[must_use]
    pub fn builder() -> RedpandaEventBusBuilder {
        RedpandaEventBusBuilder::default()
    }

    /// Open a bus with fully specified settings.
    ///
    /// # Errors
    ///
    /// [`EventBusError::ConnectionFailed`] if no broker is given or the
    /// producer configuration is rejected.
    pub fn with_settings(settings: KafkaSettings) -> Result<Self, EventBusError> {
        if settings.brokers.trim().is_empty() {
            return Err(EventBusError::ConnectionFailed(
                "no brokers configured".to_string(),
            ));
        }

        let producer = settings
            .producer_config()
            .create()
            .map_err(|e| EventBusError::ConnectionFailed(format!("producer: {e}")))?;

        tracing::info!(
            brokers = %settings.brokers,
            client_id = %settings.client_id,
            acks = %settings.acks,
            compression = %settings.compression,
            offset_reset = settings.offset_reset.as_str(),
            "Kafka producer ready"
        );

        Ok(Self { producer, settings })
    }

    /// Broker list this bus talks to.
    #[must_use]
    pub fn brokers(&self) -> &str {
        &self.settings.brokers
    }

    /// Client id reported to the broker.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.settings.client_id
    }

    /// Settings in effect.
    #[must_use]
    pub const fn settings(&self) -> &KafkaSettings {
        &self.settings
    }

    fn open_consumer(&self, topics: &[String]) -> Result<(StreamConsumer, String), EventBusError> {
        let group = self.settings.group_for(topics);
        let failed = |reason: String| EventBusError::SubscriptionFailed {
            topics: topics.to_vec(),
            reason,
        };

        let consumer: StreamConsumer = self
            .settings
            .consumer_config(&group)
            .create()
            .map_err(|e| failed(format!("consumer: {e}")))?;

        let names: Vec<&str> = topics.iter().map(String::as_str).collect();
        consumer
            .subscribe(&names)
            .map_err(|e| failed(e.to_string()))?;

        Ok((consumer, group))
    }
}

/// Commit the offset after `offset` on one partition.
fn commit_next(consumer: &StreamConsumer, topic: &str, partition: i32, offset: i64) {
    let mut position = TopicPartitionList::new();
    let committed = position
        .add_partition_offset(topic, partition, Offset::Offset(offset + 1))
        .and_then(|()| consumer.commit(&position, CommitMode::Async));

    if let Err(e) = committed {
        tracing::warn!(
            topic,
            partition,
            offset,
            error = %e,
            "Offset commit failed; record may be delivered again"
        );
    }
}

impl EventBus for RedpandaEventBus {
    fn publish(
        &self,
        topic: &str,
        record: &EventRecord,
    ) -> Pin<Box<dyn Future<Output = Result<(), EventBusError>> + Send + '_>> {
        let topic = topic.to_string();
        let record = record.clone();

        Box::pin(async move {
            let sent = self
                .producer
                .send(
                    to_kafka(&topic, &record),
                    Timeout::After(self.settings.delivery_timeout),
                )
                .await;

            match sent {
                Ok((partition, offset)) => {
                    tracing::debug!(%topic, partition, offset, key = ?record.key, "Published");
                    Ok(())
                }
                Err((e, _)) => {
                    tracing::error!(%topic, key = ?record.key, error = %e, "Publish failed");
                    Err(EventBusError::PublishFailed {
                        topic,
                        reason: e.to_string(),
                    })
                }
            }
        })
    }

    fn subscribe(
        &self,
        topics: &[&str],
    ) -> Pin<Box<dyn Future<Output = Result<EventStream, EventBusError>> + Send + '_>> {
        let topics: Vec<String> = topics.iter().map(|t| (*t).to_string()).collect();

        Box::pin(async move {
            let (consumer, group) = self.open_consumer(&topics)?;
            tracing::info!(?topics, %group, "Subscribed");

            let commit = self.settings.commit_offsets;

            // A record's offset is committed when the subscriber asks for the
            // next one, i.e. after it finished with the record.
            let stream = async_stream::stream! {
                loop {
                    let (record, position) = match consumer.recv().await {
                        Ok(message) => (
                            from_kafka(&message),
                            (message.topic().to_string(), message.partition(), message.offset()),
                        ),
                        Err(e) => {
                            yield Err(EventBusError::TransportError(e.to_string()));
                            continue;
                        }
                    };

                    yield record;

                    if commit {
                        let (topic, partition, offset) = position;
                        commit_next(&consumer, &topic, partition, offset);
                    }
                }
                #[allow(unreachable_code)]
                ()
            };
            Ok(Box::pin(stream) as EventStream)
        })
    }
}

/// Builder for [`RedpandaEventBus`].
///
/// ```no_run
/// use order_stream_redpanda::{OffsetReset, RedpandaEventBus};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = RedpandaEventBus::builder()
///     .brokers("localhost:9092")
///     .client_id("order-api")
///     .producer_acks("all")
///     .consumer_group("order-api-stats")
///     .offset_reset(OffsetReset::Latest)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RedpandaEventBusBuilder {
    settings: KafkaSettings,
}

impl Default for RedpandaEventBusBuilder {
    fn default() -> Self {
        Self {
            settings: KafkaSettings::new(""),
        }
    }
}

impl RedpandaEventBusBuilder {
    /// Comma-separated broker list. Required.
    #[must_use]
    pub fn brokers(mut self, brokers: impl Into<String>) -> Self {
        self.settings.brokers = brokers.into();
        self
    }

    /// Default: `order-stream`
    #[must_use]
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.settings.client_id = client_id.into();
        self
    }

    /// `0`, `1` or `all`. Default: `1`
    #[must_use]
    pub fn producer_acks(mut self, acks: impl Into<String>) -> Self {
        self.settings.acks = acks.into();
        self
    }

    /// `none`, `gzip`, `snappy`, `lz4` or `zstd`. Default: `none`
    #[must_use]
    pub fn compression(mut self, codec: impl Into<String>) -> Self {
        self.settings.compression = codec.into();
        self
    }

    /// How long a publish may wait for delivery. Default: 5 s
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.delivery_timeout = timeout;
        self
    }

    /// Group for every subscription of this bus.
    #[must_use]
    pub fn consumer_group(mut self, group: impl Into<String>) -> Self {
        self.settings.consumer_group = Some(group.into());
        self
    }

    /// Messages prefetched per partition, at least one. Default: 1000
    #[must_use]
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.settings.buffer_size = size.max(1);
        self
    }

    /// Default: [`OffsetReset::Latest`]
    #[must_use]
    pub const fn offset_reset(mut self, reset: OffsetReset) -> Self {
        self.settings.offset_reset = reset;
        self
    }

    /// Commit offsets of processed records. Default: `true`
    ///
    /// Turn off for consumers that must read from `earliest` on every start.
    #[must_use]
    pub const fn commit_offsets(mut self, commit: bool) -> Self {
        self.settings.commit_offsets = commit;
        self
    }

    /// Create the producer.
    ///
    /// # Errors
    ///
    /// See [`RedpandaEventBus::with_settings`].
    pub fn build(self) -> Result<RedpandaEventBus, EventBusError> {
        RedpandaEventBus::with_settings(self.settings)
    }
}
