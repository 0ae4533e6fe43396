//! Prometheus scrape endpoint.
//!
//! ```rust,no_run
//! use order_stream_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?; // GET http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::describe_counter;
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use thiserror::Error;

/// Histogram buckets for any metric ending in `price`, in currency units.
const PRICE_BUCKETS: &[f64] = &[
    1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1_000.0, 5_000.0, 10_000.0, 50_000.0, 100_000.0,
];

/// The exporter could not be set up.
#[derive(Error, Debug)]
#[error("Prometheus exporter: {0}")]
pub struct MetricsError(#[from] BuildError);

/// Owns the global recorder and the HTTP listener Prometheus scrapes.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Exporter that will listen on `addr`.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the recorder and start serving. Needs a tokio runtime.
    ///
    /// When another recorder is already installed this one is discarded with a
    /// warning and nothing is served.
    ///
    /// # Errors
    ///
    /// [`MetricsError`] if the exporter cannot be built, e.g. the listener
    /// address is taken.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(Matcher::Suffix("price".to_string()), PRICE_BUCKETS)?
            .build()?;
        let handle = recorder.handle();

        if metrics::set_global_recorder(recorder).is_err() {
            tracing::warn!(addr = %self.addr, "A metrics recorder is already installed");
            return Ok(());
        }
        describe_consumer_metrics();

        let addr = self.addr;
        tokio::spawn(async move {
            if exporter.await.is_err() {
                tracing::error!(%addr, "Metrics listener stopped");
            }
        });
        tracing::info!(%addr, "Serving metrics on /metrics");

        self.handle = Some(handle);
        Ok(())
    }

    /// Recorder handle, once [`start`](Self::start) installed one.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Current scrape output, once started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle().map(PrometheusHandle::render)
    }
}

fn describe_consumer_metrics() {
    describe_counter!(
        "order_stream_consumer_records_total",
        "Records a consumer received"
    );
    describe_counter!(
        "order_stream_consumer_handler_errors_total",
        "Records a consumer's handler failed to process"
    );
    describe_counter!(
        "order_stream_consumer_resubscribes_total",
        "Times a consumer waited before subscribing again"
    );
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn nothing_renders_before_start() {
        let server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        assert!(server.render().is_none());
    }

    #[tokio::test]
    async fn started_server_renders_consumer_counters() {
        let mut server = MetricsServer::new("127.0.0.1:0".parse().unwrap());
        server.start().unwrap();

        metrics::counter!("order_stream_consumer_records_total", "consumer" => "stats").increment(2);

        // Another test binary may own the global recorder.
        if let Some(scrape) = server.render() {
            assert!(scrape.contains("order_stream_consumer_records_total"));
        }
    }
}
