//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mock_proxy_requests_total` (counter): requests by method, status, origin
//! - `mock_proxy_request_duration_seconds` (histogram): latency distribution
//! - `mock_proxy_fixture_lookups_total` (counter): fixture hits and misses
//! - `mock_proxy_proxy_errors_total` (counter): upstream failures by kind
//! - `mock_proxy_captures_total` (counter): recorded fixtures by result
//! - `mock_proxy_serving_mode` (gauge): 0=FULL_PROXY .. 3=FULL_MOCK
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::ServingMode;

/// Install the Prometheus recorder with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, origin: &'static str, start: Instant) {
    counter!(
        "mock_proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "origin" => origin
    )
    .increment(1);
    histogram!("mock_proxy_request_duration_seconds", "origin" => origin)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_fixture_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("mock_proxy_fixture_lookups_total", "result" => result).increment(1);
}

pub fn record_proxy_error(kind: &'static str) {
    counter!("mock_proxy_proxy_errors_total", "kind" => kind).increment(1);
}

pub fn record_capture(ok: bool) {
    let result = if ok { "ok" } else { "failed" };
    counter!("mock_proxy_captures_total", "result" => result).increment(1);
}

pub fn record_mode(mode: ServingMode) {
    gauge!("mock_proxy_serving_mode").set(f64::from(mode as u8));
}
