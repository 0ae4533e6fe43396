//! Order API server.
//!
//! # Usage
//!
//! ```bash
//! # Start PostgreSQL and Kafka
//! docker compose up -d
//!
//! # Run server
//! cargo run --bin order-api
//! ```

use order_stream_runtime::MetricsServer;
use order_stream_server::{Application, Config, metrics};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "order_stream=info,order_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting order API");

    let config = Config::from_env();
    info!(
        database = %config.database.redacted_url(),
        brokers = %config.kafka.brokers,
        orders_topic = %config.kafka.orders_topic,
        stats_topic = %config.kafka.stats_topic,
        "Configuration loaded"
    );

    if let Some(addr) = config.server.metrics_address() {
        let mut metrics_server = MetricsServer::new(addr);
        metrics_server.start()?;
    }
    metrics::describe();

    let app = Application::build(&config).await.inspect_err(|e| {
        error!(error = %e, "Startup failed");
    })?;

    app.run().await?;
    Ok(())
}
