//! Application lifecycle management and graceful shutdown.
//!
//! 1. **Startup**: connect to PostgreSQL (retrying while it comes up), create
//!    the schema, build the Kafka producer, bind the listener
//! 2. **Runtime**: serve HTTP and consume `order-stats` in the background
//! 3. **Shutdown**: on Ctrl+C / SIGTERM the server stops accepting, the
//!    consumers are signalled and awaited up to `SHUTDOWN_TIMEOUT`
//!
//! # Example
//!
//! ```rust,ignore
//! let app = Application::build(&config).await?;
//! app.run().await?;
//! ```

use crate::config::Config;
use crate::handlers::StatsUpdateHandler;
use crate::publisher::OrderPublisher;
use crate::server::{AppState, build_router};
use order_stream_core::environment::{Clock, SystemClock};
use order_stream_core::{EventBus, EventBusError, EventLog, OrderRepository, RepositoryError, StatsCache};
use order_stream_postgres::PostgresOrderStore;
use order_stream_redpanda::{OffsetReset, RedpandaEventBus};
use order_stream_runtime::{
    ConsumerBuildError, EventConsumer, RetryPolicy, retry_with_backoff, shutdown_signal,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Errors that prevent the application from starting.
#[derive(Error, Debug)]
pub enum StartupError {
    /// The database could not be reached or the schema could not be created.
    #[error("Database startup failed: {0}")]
    Database(#[from] RepositoryError),

    /// The Kafka producer could not be created.
    #[error("Event bus startup failed: {0}")]
    EventBus(#[from] EventBusError),

    /// A background consumer was misconfigured.
    #[error("Failed to configure consumer: {0}")]
    Consumer(#[from] ConsumerBuildError),

    /// The HTTP listener could not be bound.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        /// Address that was requested
        address: String,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

/// Running application with all background tasks.
pub struct Application {
    /// TCP listener for HTTP server
    listener: TcpListener,

    /// Axum router with all HTTP routes
    router: axum::Router,

    /// Background consumers (the stats subscriber)
    consumers: Vec<EventConsumer>,

    /// Shutdown signal broadcaster
    shutdown_tx: broadcast::Sender<()>,

    /// How long to wait for consumers on shutdown
    shutdown_timeout: Duration,
}

impl Application {
    /// Connect to PostgreSQL and Kafka, create the schema and bind the listener.
    ///
    /// Connecting and schema creation are retried with exponential backoff,
    /// `STARTUP_MAX_RETRIES` times.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] if any external resource is unavailable.
    pub async fn build(config: &Config) -> Result<Self, StartupError> {
        let policy = RetryPolicy::builder()
            .max_retries(config.startup.max_retries)
            .initial_delay(Duration::from_secs(1))
            .build();

        let store = retry_with_backoff(policy, "connect to database", || async {
            let store = PostgresOrderStore::connect(
                &config.database.url,
                config.database.max_connections,
                config.database.connect_timeout(),
            )
            .await?;
            store.initialize().await?;
            Ok::<_, RepositoryError>(store)
        })
        .await?;

        let event_bus = RedpandaEventBus::builder()
            .brokers(&config.kafka.brokers)
            .client_id(&config.kafka.client_id)
            .producer_acks(&config.kafka.producer_acks)
            .compression(&config.kafka.compression)
            .consumer_group(&config.kafka.stats_consumer_group)
            .offset_reset(OffsetReset::Latest)
            .build()?;

        let address = config.server.bind_address();
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StartupError::Bind { address, source })?;

        Self::assemble(
            config,
            Arc::new(store),
            Arc::new(event_bus),
            Arc::new(SystemClock),
            listener,
        )
    }

    /// Wire the application from already-created collaborators.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError::Consumer`] if the stats consumer cannot be built.
    pub fn assemble(
        config: &Config,
        repository: Arc<dyn OrderRepository>,
        event_bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        listener: TcpListener,
    ) -> Result<Self, StartupError> {
        let stats_cache = Arc::new(StatsCache::new());
        let event_log = Arc::new(EventLog::new(config.event_log.max_size));
        let publisher = Arc::new(OrderPublisher::new(
            event_bus.clone(),
            config.kafka.orders_topic.clone(),
        ));

        let state = AppState::new(
            repository,
            publisher,
            stats_cache.clone(),
            event_log.clone(),
            clock.clone(),
        )
        .with_view_size(config.event_log.view_size);

        let (shutdown_tx, _) = broadcast::channel(1);

        let stats_consumer = EventConsumer::builder()
            .name("stats")
            .topics(vec![config.kafka.stats_topic.clone()])
            .event_bus(event_bus)
            .handler(Arc::new(StatsUpdateHandler::new(stats_cache, event_log, clock)))
            .shutdown(shutdown_tx.subscribe())
            .retry_delay(config.consumer.retry_delay())
            .build()?;

        Ok(Self {
            listener,
            router: build_router(state),
            consumers: vec![stats_consumer],
            shutdown_tx,
            shutdown_timeout: config.server.shutdown_timeout(),
        })
    }

    /// Address the HTTP listener is bound to.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the socket address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// A handle to the router, for driving requests without a socket.
    #[must_use]
    pub fn router(&self) -> axum::Router {
        self.router.clone()
    }

    /// Run until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP server fails.
    pub async fn run(self) -> std::io::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` completes, then stop the consumers.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP server fails.
    pub async fn run_until<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let address = self.listener.local_addr()?;

        info!(consumer_count = self.consumers.len(), "Starting event consumers");
        let consumer_handles: Vec<_> = self
            .consumers
            .into_iter()
            .map(|consumer| {
                let name = consumer.name().to_string();
                (name, consumer.spawn())
            })
            .collect();

        info!(address = %address, "HTTP server listening for requests");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("HTTP server stopped, initiating graceful shutdown...");

        // No receivers left just means every consumer already stopped.
        let _ = self.shutdown_tx.send(());

        Self::await_shutdown(consumer_handles, self.shutdown_timeout).await;

        info!("Graceful shutdown complete");
        Ok(())
    }

    /// Wait for background consumers, each for at most `timeout`.
    async fn await_shutdown(
        consumer_handles: Vec<(String, tokio::task::JoinHandle<()>)>,
        timeout: Duration,
    ) {
        for (name, handle) in consumer_handles {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => info!(consumer = %name, "Consumer stopped gracefully"),
                Ok(Err(e)) => warn!(consumer = %name, error = %e, "Consumer task failed"),
                Err(_) => warn!(consumer = %name, "Consumer shutdown timed out"),
            }
        }
    }
}
