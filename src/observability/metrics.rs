//! Metrics collection and exposition.
//!
//! # Metrics
//! - `rest_requests_total` (counter): requests by collection, action, status
//! - `rest_request_duration_seconds` (histogram): latency by collection,
//!   action
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder it costs next to nothing
//! - Prometheus exposition runs on its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished request.
pub fn record_request(collection: &str, action: &str, status: u16, started: Instant) {
    counter!(
        "rest_requests_total",
        "collection" => collection.to_string(),
        "action" => action.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "rest_request_duration_seconds",
        "collection" => collection.to_string(),
        "action" => action.to_string()
    )
    .record(started.elapsed().as_secs_f64());
}
