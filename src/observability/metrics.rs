//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status, route group
//! - `http_request_duration_seconds` (histogram): latency distribution
//! - `http_rate_limited_total` (counter): rejections by the rate limiter
//! - `http_cors_rejected_total` (counter): rejections by the origin check
//!
//! Recording is a no-op until a recorder is installed, so tests never need
//! the exporter.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, group: &'static str, elapsed: Duration) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "group" => group
    )
    .increment(1);
    metrics::histogram!("http_request_duration_seconds", "group" => group)
        .record(elapsed.as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("http_rate_limited_total").increment(1);
}

pub fn record_cors_rejected() {
    metrics::counter!("http_cors_rejected_total").increment(1);
}
