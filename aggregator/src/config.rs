//! Aggregator configuration, read from the environment.

use order_stream_redpanda::{KafkaSettings, OffsetReset};
use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Settings for the stats aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Broker addresses (comma-separated)
    pub brokers: String,
    /// Consumer group; also identifies the application to the broker
    pub application_id: String,
    /// Topic orders are read from
    pub input_topic: String,
    /// Topic snapshots are written to
    pub output_topic: String,
    /// Seconds to wait before resubscribing after a failure
    pub retry_delay_secs: u64,
    /// Prometheus exporter port (0 disables the exporter)
    pub metrics_port: u16,
}

fn string_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl AggregatorConfig {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = &lookup;
        Self {
            brokers: string_or(lookup, "KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"),
            application_id: string_or(lookup, "APPLICATION_ID", "order-stats-app"),
            input_topic: string_or(lookup, "ORDERS_TOPIC", "orders"),
            output_topic: string_or(lookup, "STATS_TOPIC", "order-stats"),
            retry_delay_secs: parse_or(lookup, "CONSUMER_RETRY_DELAY_SECS", 5),
            metrics_port: parse_or(lookup, "METRICS_PORT", 0),
        }
    }

    /// Wait between resubscription attempts.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    /// Broker settings for the aggregator's bus.
    ///
    /// The totals live only in memory, so every start reads the input topic
    /// from its first record and offsets are never committed.
    #[must_use]
    pub fn kafka_settings(&self) -> KafkaSettings {
        let mut settings = KafkaSettings::new(self.brokers.clone());
        settings.client_id.clone_from(&self.application_id);
        settings.consumer_group = Some(self.application_id.clone());
        settings.offset_reset = OffsetReset::Earliest;
        settings.commit_offsets = false;
        settings
    }

    /// Address of the Prometheus exporter, or `None` when disabled.
    #[must_use]
    pub fn metrics_address(&self) -> Option<SocketAddr> {
        (self.metrics_port != 0)
            .then(|| SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), self.metrics_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_streams_application() {
        let config = AggregatorConfig::from_lookup(|_| None);
        assert_eq!(config.brokers, "localhost:9092");
        assert_eq!(config.application_id, "order-stats-app");
        assert_eq!(config.input_topic, "orders");
        assert_eq!(config.output_topic, "order-stats");
        assert_eq!(config.retry_delay(), Duration::from_secs(5));
        assert_eq!(config.metrics_address(), None);
    }

    #[test]
    fn consumer_replays_from_the_start_without_committing() {
        let config = AggregatorConfig::from_lookup(|_| None);
        let settings = config.kafka_settings();

        assert!(!settings.commit_offsets);
        assert_eq!(settings.offset_reset, OffsetReset::Earliest);
        assert_eq!(settings.client_id, "order-stats-app");

        let consumer = settings.consumer_config(&settings.group_for(&[config.input_topic]));
        assert_eq!(consumer.get("group.id"), Some("order-stats-app"));
        assert_eq!(consumer.get("enable.auto.commit"), Some("false"));
        assert_eq!(consumer.get("auto.offset.reset"), Some("earliest"));
    }

    #[test]
    fn overrides_are_read() {
        let config = AggregatorConfig::from_lookup(|key| match key {
            "APPLICATION_ID" => Some("stats-v2".to_string()),
            "METRICS_PORT" => Some("9191".to_string()),
            "CONSUMER_RETRY_DELAY_SECS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(config.application_id, "stats-v2");
        assert_eq!(config.metrics_address().map(|a| a.port()), Some(9191));
        assert_eq!(config.retry_delay(), Duration::from_secs(5));
    }
}
