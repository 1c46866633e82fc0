//! Prometheus metrics for the publish chain.
//!
//! Provides a [`MetricsFilter`] that records publish counts, outcomes, and
//! latency, and a [`MetricsServer`] that installs the Prometheus recorder
//! and renders the scrape payload for whatever HTTP surface the host
//! process exposes.
//!
//! # Example
//!
//! ```rust,no_run
//! use eventline_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! let _scrape_body = server.render();
//! # Ok(())
//! # }
//! ```

use eventline_core::context::PublishContext;
use eventline_core::filter::{Next, PublishFilter, PublishFuture};
use eventline_core::publisher::PublishOutcome;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Instant;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics recorder host.
///
/// Installs the global recorder and keeps the handle that renders the
/// Prometheus scrape payload; serve [`render`](Self::render) from the host
/// process's HTTP surface at the configured address.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Socket address the host process serves scrapes on
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Register metric descriptions and install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns an error if the exporter cannot be built or installed.
    ///
    /// # Note
    ///
    /// If a metrics recorder is already installed (e.g., in tests), this
    /// tolerates the re-initialization and leaves the existing recorder in
    /// place. In production, ensure this is only called once.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            // Histogram buckets for latency measurements
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        match builder.install_recorder() {
            Ok(handle) => {
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics recorder installed, serve render() at /metrics"
                );
                Ok(())
            }
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already initialized") {
                    tracing::warn!(
                        "Metrics recorder already initialized, skipping re-initialization"
                    );
                    Ok(())
                } else {
                    Err(MetricsError::Install(err_msg))
                }
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus format.
    ///
    /// Returns `None` if the server hasn't been started.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

/// Register all metric descriptions.
fn register_metrics() {
    describe_counter!(
        "integration_events_published_total",
        "Total number of events delivered by the terminal transport"
    );
    describe_counter!(
        "integration_events_short_circuited_total",
        "Total number of publishes ended early by a filter"
    );
    describe_counter!(
        "integration_events_publish_errors_total",
        "Total number of publish traversals that faulted"
    );
    describe_histogram!(
        "integration_event_publish_duration_seconds",
        "Time taken for one publish traversal"
    );
}

/// Publish metrics recorder.
pub struct PublisherMetrics;

impl PublisherMetrics {
    /// Record a delivered publish.
    pub fn record_delivered(duration: std::time::Duration) {
        counter!("integration_events_published_total").increment(1);
        histogram!("integration_event_publish_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a short-circuited publish.
    pub fn record_short_circuit(filter: &'static str) {
        counter!("integration_events_short_circuited_total", "filter" => filter).increment(1);
    }

    /// Record a faulted publish.
    pub fn record_error() {
        counter!("integration_events_publish_errors_total").increment(1);
    }
}

/// A filter that records outcome counters and a latency histogram for every
/// traversal it forwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsFilter;

impl MetricsFilter {
    /// Create a metrics filter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl PublishFilter for MetricsFilter {
    fn name(&self) -> &'static str {
        "metrics"
    }

    fn on_publish<'a>(&'a self, ctx: &'a mut PublishContext, next: Next) -> PublishFuture<'a> {
        Box::pin(async move {
            let started = Instant::now();
            let result = next.run(ctx).await;

            match &result {
                Ok(PublishOutcome::Delivered) => {
                    PublisherMetrics::record_delivered(started.elapsed());
                }
                Ok(PublishOutcome::ShortCircuited { filter, .. }) => {
                    PublisherMetrics::record_short_circuit(*filter);
                }
                Err(_) => PublisherMetrics::record_error(),
            }

            result
        })
    }
}
