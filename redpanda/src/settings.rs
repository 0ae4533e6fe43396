//! Client settings shared by the producer and every subscription consumer.

use rdkafka::config::ClientConfig;
use std::time::Duration;

/// Where a consumer group with no committed offset starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetReset {
    /// Only records produced after the subscription (`fromBeginning: false`).
    #[default]
    Latest,
    /// Replay the topic from its first retained record.
    Earliest,
}

impl OffsetReset {
    /// The `auto.offset.reset` value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Earliest => "earliest",
        }
    }

    /// Parse `"earliest"`/`"beginning"` or `"latest"`/`"end"`; anything else is `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "earliest" | "beginning" | "smallest" => Some(Self::Earliest),
            "latest" | "end" | "largest" => Some(Self::Latest),
            _ => None,
        }
    }
}

/// Connection and tuning settings for one broker cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaSettings {
    /// Comma-separated `host:port` list
    pub brokers: String,
    /// Reported to the broker as `client.id`
    pub client_id: String,
    /// Producer `acks`: `0`, `1` or `all`
    pub acks: String,
    /// Producer `compression.type`
    pub compression: String,
    /// How long a publish may wait for the broker
    pub delivery_timeout: Duration,
    /// Group for subscriptions; derived from the topics when unset
    pub consumer_group: Option<String>,
    /// Start position for a group without committed offsets
    pub offset_reset: OffsetReset,
    /// Messages librdkafka prefetches per partition (`queued.min.messages`)
    pub buffer_size: usize,
    /// Commit each record's offset once the subscriber is done with it.
    ///
    /// Off for consumers that rebuild their state from the start of the topic
    /// on every run: they must never resume mid-topic.
    pub commit_offsets: bool,
}

impl KafkaSettings {
    /// Settings for `brokers` with every other value at its default.
    #[must_use]
    pub fn new(brokers: impl Into<String>) -> Self {
        Self {
            brokers: brokers.into(),
            client_id: "order-stream".to_string(),
            acks: "1".to_string(),
            compression: "none".to_string(),
            delivery_timeout: Duration::from_secs(5),
            consumer_group: None,
            offset_reset: OffsetReset::Latest,
            buffer_size: 1000,
            commit_offsets: true,
        }
    }

    /// Producer configuration.
    #[must_use]
    pub fn producer_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("client.id", &self.client_id)
            .set("acks", &self.acks)
            .set("compression.type", &self.compression)
            .set(
                "message.timeout.ms",
                self.delivery_timeout.as_millis().to_string(),
            );
        config
    }

    /// Group used when subscribing to `topics`.
    ///
    /// The configured group, or `order-stream-` followed by the sorted topic names.
    #[must_use]
    pub fn group_for(&self, topics: &[String]) -> String {
        self.consumer_group.clone().unwrap_or_else(|| {
            let mut sorted = topics.to_vec();
            sorted.sort();
            format!("order-stream-{}", sorted.join("-"))
        })
    }

    /// Consumer configuration for `group`, with offsets committed by hand.
    #[must_use]
    pub fn consumer_config(&self, group: &str) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", &self.brokers)
            .set("client.id", &self.client_id)
            .set("group.id", group)
            .set("auto.offset.reset", self.offset_reset.as_str())
            .set("enable.auto.commit", "false")
            .set("enable.partition.eof", "false")
            .set("session.timeout.ms", "6000")
            .set("queued.min.messages", self.buffer_size.max(1).to_string());
        config
    }
}
