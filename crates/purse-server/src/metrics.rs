//! Metrics collection and export for Purse.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "purse_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "purse_connections_active";
    pub const TOPUPS_TOTAL: &str = "purse_topups_total";
    pub const BALANCE_QUERIES_TOTAL: &str = "purse_balance_queries_total";
    pub const BROADCASTS_TOTAL: &str = "purse_broadcasts_total";
    pub const BROADCAST_RECIPIENTS_TOTAL: &str = "purse_broadcast_recipients_total";
    pub const SUBSCRIBERS_PRUNED_TOTAL: &str = "purse_subscribers_pruned_total";
    pub const ERRORS_TOTAL: &str = "purse_errors_total";
}

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    metrics::describe_counter!(
        names::CONNECTIONS_TOTAL,
        "Total number of feed connections since server start"
    );
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Current number of open feed connections"
    );
    metrics::describe_counter!(names::TOPUPS_TOTAL, "Top-up requests by outcome");
    metrics::describe_counter!(
        names::BALANCE_QUERIES_TOTAL,
        "Balance queries by outcome"
    );
    metrics::describe_counter!(names::BROADCASTS_TOTAL, "Total number of broadcasts");
    metrics::describe_counter!(
        names::BROADCAST_RECIPIENTS_TOTAL,
        "Total number of broadcast deliveries"
    );
    metrics::describe_counter!(
        names::SUBSCRIBERS_PRUNED_TOTAL,
        "Subscribers removed after a failed delivery"
    );
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");
}

/// Install the Prometheus exporter on `addr`, then describe every metric.
///
/// # Errors
///
/// Returns an error if the exporter cannot be installed.
pub fn start_metrics_server(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    describe_metrics();

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a top-up outcome.
pub fn record_topup(outcome: &'static str) {
    counter!(names::TOPUPS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a balance query outcome.
pub fn record_balance_query(found: bool) {
    let outcome = if found { "found" } else { "not_found" };
    counter!(names::BALANCE_QUERIES_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a broadcast and its fan-out.
pub fn record_broadcast(delivered: usize, pruned: usize) {
    counter!(names::BROADCASTS_TOTAL).increment(1);
    counter!(names::BROADCAST_RECIPIENTS_TOTAL).increment(delivered as u64);
    counter!(names::SUBSCRIBERS_PRUNED_TOTAL).increment(pruned as u64);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Metrics guard that tracks an open feed connection until dropped.
pub struct ConnectionMetricsGuard;

impl ConnectionMetricsGuard {
    /// Create a new metrics guard, recording a connection.
    #[must_use]
    pub fn new() -> Self {
        counter!(names::CONNECTIONS_TOTAL).increment(1);
        gauge!(names::CONNECTIONS_ACTIVE).increment(1.0);
        Self
    }
}

impl Default for ConnectionMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionMetricsGuard {
    fn drop(&mut self) {
        gauge!(names::CONNECTIONS_ACTIVE).decrement(1.0);
    }
}
