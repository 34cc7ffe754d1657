//! Metrics collection and exposition.
//!
//! # Metrics
//! - `counters_page_requests_request_count` (counter): requests by route
//!   and method, owned by [`CounterRegistry`](super::counters::CounterRegistry)
//! - `gateway_circuit_events_total` (counter): breaker outcomes by command
//! - `gateway_circuit_open` (gauge): 1 while a command's circuit is open
//!
//! Breaker metrics go through the `metrics` facade and are no-ops until a
//! recorder is installed.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::resilience::Outcome;

/// Install the process-wide Prometheus recorder.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            tracing::info!("Prometheus recorder installed");
            Some(handle)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    }
}

pub fn record_breaker_event(command: &str, outcome: Outcome) {
    metrics::counter!(
        "gateway_circuit_events_total",
        "command" => command.to_string(),
        "event" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_breaker_open(command: &str, open: bool) {
    metrics::gauge!("gateway_circuit_open", "command" => command.to_string())
        .set(if open { 1.0 } else { 0.0 });
}
