//! Metrics collection and export for Ofrezco Live.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use ofrezco_live_core::DeliveryReport;
use std::net::SocketAddr;
use tracing::info;

/// Metric names.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "ofrezco_live_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "ofrezco_live_connections_active";
    pub const MESSAGES_TOTAL: &str = "ofrezco_live_messages_total";
    pub const MESSAGES_BYTES: &str = "ofrezco_live_messages_bytes";
    pub const DELIVERIES_TOTAL: &str = "ofrezco_live_deliveries_total";
    pub const DELIVERY_FAILURES_TOTAL: &str = "ofrezco_live_delivery_failures_total";
    pub const ROOMS_ACTIVE: &str = "ofrezco_live_rooms_active";
    pub const POLLS_TOTAL: &str = "ofrezco_live_polls_total";
    pub const ERRORS_TOTAL: &str = "ofrezco_live_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::CONNECTIONS_TOTAL,
        "Total number of chat connections since server start"
    );
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Current number of open chat connections"
    );
    metrics::describe_counter!(names::MESSAGES_TOTAL, "Total number of chat frames processed");
    metrics::describe_counter!(names::MESSAGES_BYTES, "Total bytes of chat frames processed");
    metrics::describe_counter!(
        names::DELIVERIES_TOTAL,
        "Envelopes accepted by a member's outbound queue"
    );
    metrics::describe_counter!(
        names::DELIVERY_FAILURES_TOTAL,
        "Envelopes dropped for a stale or saturated member"
    );
    metrics::describe_gauge!(names::ROOMS_ACTIVE, "Current number of live rooms");
    metrics::describe_counter!(names::POLLS_TOTAL, "Interest cursor polls by outcome");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a new connection.
pub fn record_connection() {
    counter!(names::CONNECTIONS_TOTAL).increment(1);
    gauge!(names::CONNECTIONS_ACTIVE).increment(1.0);
}

/// Record a disconnection.
pub fn record_disconnection() {
    gauge!(names::CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record a chat frame.
pub fn record_message(bytes: usize, direction: &'static str) {
    counter!(names::MESSAGES_TOTAL, "direction" => direction).increment(1);
    counter!(names::MESSAGES_BYTES, "direction" => direction).increment(bytes as u64);
}

/// Record the outcome of a broadcast pass.
pub fn record_broadcast(report: &DeliveryReport) {
    counter!(names::DELIVERIES_TOTAL).increment(report.delivered as u64);
    if report.failed > 0 {
        counter!(names::DELIVERY_FAILURES_TOTAL).increment(report.failed as u64);
    }
}

/// Update active room count.
pub fn set_active_rooms(count: usize) {
    gauge!(names::ROOMS_ACTIVE).set(count as f64);
}

/// Record an interest poll.
pub fn record_poll(has_new: bool) {
    let outcome = if has_new { "new" } else { "none" };
    counter!(names::POLLS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Metrics guard that records disconnection on drop.
pub struct ConnectionMetricsGuard;

impl ConnectionMetricsGuard {
    /// Create a new metrics guard, recording a connection.
    #[must_use]
    pub fn new() -> Self {
        record_connection();
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
        record_disconnection();
    }
}
