//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define render metrics (requests by outcome, fetch results, latency)
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `render_requests_total` (counter): server renders by outcome
//! - `render_request_duration_seconds` (histogram): full request latency
//! - `initial_data_fetch_total` (counter): fetches by result
//! - `initial_data_fetch_duration_seconds` (histogram): fetch latency
//! - `navigation_commits_total` (counter): client commits by cause
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so library code
//!   records unconditionally
//! - Labels are low-cardinality (outcome, result, cause), never paths

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

/// Record one server render.
pub fn record_render(outcome: &'static str, start: Instant) {
    metrics::counter!("render_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("render_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

/// Record one initial-data fetch.
pub fn record_fetch(result: &'static str, start: Instant) {
    metrics::counter!("initial_data_fetch_total", "result" => result).increment(1);
    metrics::histogram!("initial_data_fetch_duration_seconds", "result" => result)
        .record(start.elapsed().as_secs_f64());
}

/// Record a navigation commit (`cached`, `fetched`, `failed`, `unmatched`).
pub fn record_commit(cause: &'static str) {
    metrics::counter!("navigation_commits_total", "cause" => cause).increment(1);
}
