//! Metrics collection and exposition.
//!
//! # Metrics
//! - `service_requests_total` (counter): completed requests by outcome, status
//! - `service_request_duration_seconds` (histogram): latency distribution
//! - `service_faults_total` (counter): recovered faults by kind
//! - `service_in_flight_requests` (gauge): requests inside the recovery boundary
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus text is rendered on demand by the diagnostics endpoint

use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::http::fault::FaultKind;

/// Install the global Prometheus recorder.
///
/// Returns `None` (and logs) if a recorder is already installed.
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

/// Record a request that completed without a fault.
pub fn record_request(method: &str, status: u16, start_time: Instant) {
    let duration = start_time.elapsed().as_secs_f64();
    counter!(
        "service_requests_total",
        "outcome" => "ok",
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("service_request_duration_seconds", "method" => method.to_string()).record(duration);
}

/// Record a request that ended in a recovered fault.
pub fn record_fault(kind: FaultKind, start_time: Instant) {
    counter!(
        "service_requests_total",
        "outcome" => "fault",
        "status" => "500"
    )
    .increment(1);
    counter!("service_faults_total", "kind" => kind.as_label()).increment(1);
    let duration = start_time.elapsed().as_secs_f64();
    histogram!("service_request_duration_seconds", "method" => "faulted").record(duration);
}

/// Publish the current in-flight request count.
pub fn record_in_flight(count: u64) {
    gauge!("service_in_flight_requests").set(count as f64);
}
