//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, errors, auth failures, registry fetches, routes)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): latency distribution
//! - `gateway_errors_total` (counter): error envelopes by status
//! - `gateway_auth_failures_total` (counter): rejections by kind
//! - `gateway_registry_fetch_total` (counter): registry fetches by outcome
//! - `gateway_route_table_size` (gauge): routes in the live table
//! - `gateway_route_collisions_total` (counter): lowercased name collisions
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so tests need no setup

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_error(status: u16) {
    metrics::counter!("gateway_errors_total", "status" => status.to_string()).increment(1);
}

pub fn record_auth_failure(kind: &'static str) {
    metrics::counter!("gateway_auth_failures_total", "kind" => kind).increment(1);
}

pub fn record_registry_fetch(outcome: &'static str) {
    metrics::counter!("gateway_registry_fetch_total", "outcome" => outcome).increment(1);
}

pub fn record_route_table_size(routes: usize) {
    metrics::gauge!("gateway_route_table_size").set(routes as f64);
}

pub fn record_route_collision() {
    metrics::counter!("gateway_route_collisions_total").increment(1);
}
