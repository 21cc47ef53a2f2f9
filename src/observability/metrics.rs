//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_rpc_calls_total` (counter): RPC attempts by method, outcome
//! - `relay_rpc_latency_seconds` (histogram): per-attempt latency by method
//! - `relay_failovers_total` (counter): endpoint switches by from, to
//! - `relay_endpoint_health` (gauge): 1=healthy, 0=unhealthy
//! - `relay_deliveries_total` (counter): finished deliveries by status
//! - `relay_delivery_attempts` (histogram): broadcasts per finished delivery
//!
//! Recording is a no-op until a recorder is installed.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Install the Prometheus exporter with an HTTP listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_rpc_call(method: &'static str, outcome: &'static str, latency: Duration) {
    metrics::counter!("relay_rpc_calls_total", "method" => method, "outcome" => outcome).increment(1);
    metrics::histogram!("relay_rpc_latency_seconds", "method" => method).record(latency.as_secs_f64());
}

pub fn record_failover(from: &str, to: &str) {
    metrics::counter!(
        "relay_failovers_total",
        "from" => from.to_string(),
        "to" => to.to_string()
    )
    .increment(1);
}

pub fn record_endpoint_health(endpoint: &str, healthy: bool) {
    metrics::gauge!("relay_endpoint_health", "endpoint" => endpoint.to_string())
        .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_delivery(status: &'static str, attempts: u32) {
    metrics::counter!("relay_deliveries_total", "status" => status).increment(1);
    metrics::histogram!("relay_delivery_attempts").record(f64::from(attempts));
}
