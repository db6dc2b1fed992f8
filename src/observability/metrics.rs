//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relayed calls by outcome
//! - `relay_request_duration_seconds` (histogram): end-to-end latency by outcome
//! - `relay_upstream_status_total` (counter): upstream status codes seen
//! - `relay_store_entries` (gauge): descriptors held by the request store

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record one finished relay call. `outcome` is `"ok"` or an error kind.
pub fn record_relay(outcome: &'static str, upstream_status: Option<u16>, start: Instant) {
    metrics::counter!("relay_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("relay_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());

    if let Some(status) = upstream_status {
        metrics::counter!("relay_upstream_status_total", "status" => status.to_string())
            .increment(1);
    }
}

pub fn record_store_size(entries: usize) {
    metrics::gauge!("relay_store_entries").set(entries as f64);
}
