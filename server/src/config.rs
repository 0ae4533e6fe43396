//! Configuration management for the order API.
//!
//! Loads configuration from environment variables with sensible defaults.
//! `main` loads a `.env` file (if present) before calling
//! [`Config::from_env`].

use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// `PostgreSQL` configuration
    pub database: DatabaseConfig,
    /// Kafka / Redpanda configuration
    pub kafka: KafkaConfig,
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Dashboard event log configuration
    pub event_log: EventLogConfig,
    /// Stats consumer configuration
    pub consumer: ConsumerConfig,
    /// Startup behavior
    pub startup: StartupConfig,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Kafka / Redpanda configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaConfig {
    /// Broker addresses (comma-separated)
    pub brokers: String,
    /// Client identifier reported to the broker
    pub client_id: String,
    /// Topic orders are published to
    pub orders_topic: String,
    /// Topic aggregate statistics are consumed from
    pub stats_topic: String,
    /// Consumer group for the stats subscription
    pub stats_consumer_group: String,
    /// Producer acknowledgment mode: `0`, `1` or `all`
    pub producer_acks: String,
    /// Producer compression codec
    pub compression: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
    /// Prometheus exporter port (0 disables the exporter)
    pub metrics_port: u16,
}

/// Dashboard event log configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLogConfig {
    /// Entries kept per stream
    pub max_size: usize,
    /// Entries returned per stream by `GET /events`
    pub view_size: usize,
}

/// Stats consumer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Seconds to wait before resubscribing after a failure
    pub retry_delay_secs: u64,
}

/// Startup behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupConfig {
    /// Retries for schema initialization before giving up
    pub max_retries: usize,
}

/// Parse `key` from `lookup`, falling back to `default` when unset or invalid.
fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn string_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unset or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = &lookup;

        let database_url = lookup("DATABASE_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| {
                format!(
                    "postgres://{}:{}@{}:{}/{}",
                    string_or(lookup, "POSTGRES_USER", "orders_user"),
                    string_or(lookup, "POSTGRES_PASSWORD", "orders_pass"),
                    string_or(lookup, "POSTGRES_HOST", "localhost"),
                    parse_or(lookup, "POSTGRES_PORT", 5432_u16),
                    string_or(lookup, "POSTGRES_DB", "orders_db"),
                )
            });

        Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_or(lookup, "DATABASE_MAX_CONNECTIONS", 10),
                connect_timeout: parse_or(lookup, "DATABASE_CONNECT_TIMEOUT", 30),
            },
            kafka: KafkaConfig {
                brokers: string_or(lookup, "KAFKA_BOOTSTRAP_SERVERS", "localhost:9092"),
                client_id: string_or(lookup, "KAFKA_CLIENT_ID", "order-api"),
                orders_topic: string_or(lookup, "ORDERS_TOPIC", "orders"),
                stats_topic: string_or(lookup, "STATS_TOPIC", "order-stats"),
                stats_consumer_group: string_or(lookup, "STATS_CONSUMER_GROUP", "order-api-stats"),
                producer_acks: string_or(lookup, "KAFKA_PRODUCER_ACKS", "1"),
                compression: string_or(lookup, "KAFKA_COMPRESSION", "none"),
            },
            server: ServerConfig {
                host: string_or(lookup, "HOST", "0.0.0.0"),
                port: parse_or(lookup, "PORT", 8080),
                shutdown_timeout: parse_or(lookup, "SHUTDOWN_TIMEOUT", 10),
                metrics_port: parse_or(lookup, "METRICS_PORT", 9090),
            },
            event_log: EventLogConfig {
                max_size: parse_or(lookup, "EVENT_LOG_MAX_SIZE", 50_usize).max(1),
                view_size: parse_or(lookup, "EVENT_VIEW_SIZE", 20),
            },
            consumer: ConsumerConfig {
                retry_delay_secs: parse_or(lookup, "CONSUMER_RETRY_DELAY_SECS", 5),
            },
            startup: StartupConfig {
                max_retries: parse_or(lookup, "STARTUP_MAX_RETRIES", 5),
            },
        }
    }
}

impl DatabaseConfig {
    /// Pool connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// The connection URL with any password masked, for logging.
    #[must_use]
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        let Some((credentials, host)) = rest.rsplit_once('@') else {
            return self.url.clone();
        };
        match credentials.split_once(':') {
            Some((user, _)) => format!("{scheme}://{user}:***@{host}"),
            None => self.url.clone(),
        }
    }
}

impl ServerConfig {
    /// Address the HTTP server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Address of the Prometheus exporter, or `None` when disabled.
    #[must_use]
    pub fn metrics_address(&self) -> Option<SocketAddr> {
        if self.metrics_port == 0 {
            return None;
        }
        let ip = self
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        Some(SocketAddr::new(ip, self.metrics_port))
    }

    /// How long to wait for background tasks on shutdown.
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout)
    }
}

impl ConsumerConfig {
    /// Wait between resubscription attempts.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
