//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): proxied requests by method, status
//! - `proxy_request_duration_seconds` (histogram): proxied request latency
//! - `proxy_upstream_errors_total` (counter): transport-level forward failures
//! - `proxy_ready_checks_total` (counter): readiness probes by result
//! - `proxy_tokens_minted_total` (counter): mock credentials issued
//!
//! Recording is a no-op until a recorder is installed, so tests and
//! deployments without `METRICS_ADDRESS` pay nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder with its own scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("proxy_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_error() {
    counter!("proxy_upstream_errors_total").increment(1);
}

pub fn record_ready_check(ready: bool) {
    let result = if ready { "ready" } else { "not_ready" };
    counter!("proxy_ready_checks_total", "result" => result).increment(1);
}

pub fn record_token_minted() {
    counter!("proxy_tokens_minted_total").increment(1);
}
