//! Stats aggregator binary.
//!
//! ```bash
//! cargo run --bin order-stats
//! ```

use order_stream_aggregator::{AggregatorConfig, StatsAggregator};
use order_stream_redpanda::RedpandaEventBus;
use order_stream_runtime::{EventConsumer, MetricsServer, shutdown_signal};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_stream=info,order_stats=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AggregatorConfig::from_env();
    info!(
        brokers = %config.brokers,
        application_id = %config.application_id,
        input_topic = %config.input_topic,
        output_topic = %config.output_topic,
        "Starting stats aggregator"
    );

    if let Some(addr) = config.metrics_address() {
        let mut metrics_server = MetricsServer::new(addr);
        metrics_server.start()?;
    }

    let event_bus = Arc::new(RedpandaEventBus::with_settings(config.kafka_settings())?);

    let (shutdown_tx, _) = broadcast::channel(1);
    let consumer = EventConsumer::builder()
        .name("aggregator")
        .topics(vec![config.input_topic.clone()])
        .event_bus(event_bus.clone())
        .handler(Arc::new(StatsAggregator::new(
            event_bus,
            config.output_topic.clone(),
        )))
        .shutdown(shutdown_tx.subscribe())
        .retry_delay(config.retry_delay())
        .build()?;

    let handle = consumer.spawn();

    shutdown_signal().await;
    info!("Shutting down stats aggregator");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(Duration::from_secs(10), handle).await {
        Ok(Ok(())) => info!("Stats aggregator stopped"),
        Ok(Err(e)) => warn!(error = %e, "Aggregator task failed"),
        Err(_) => warn!("Aggregator shutdown timed out"),
    }
    Ok(())
}
