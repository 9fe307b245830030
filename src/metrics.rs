//! Prometheus metrics for the unwrapping middleware.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `pubsub_requests_total` - Requests seen by the middleware (label: outcome)
//!
//! ## Histograms
//! - `pubsub_payload_bytes` - Size of decoded payloads forwarded downstream
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter, so the
//! middleware can be used without a metrics endpoint.

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const REQUESTS_TOTAL: &str = "pubsub_requests_total";
    pub const PAYLOAD_BYTES: &str = "pubsub_payload_bytes";
}

/// Values of the `outcome` label.
pub mod outcome {
    /// Non-POST request forwarded untouched
    pub const PASSED_THROUGH: &str = "passed_through";
    /// Envelope unwrapped and forwarded
    pub const FORWARDED: &str = "forwarded";
    /// Attributes present while disallowed
    pub const REJECTED: &str = "rejected";
    /// Envelope could not be read or parsed
    pub const MALFORMED: &str = "malformed";
}

/// Initialize the Prometheus metrics exporter on `metrics_addr`.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::REQUESTS_TOTAL,
        "Total number of requests handled by the Pub/Sub unwrap middleware"
    );
    describe_histogram!(
        names::PAYLOAD_BYTES,
        "Size in bytes of decoded Pub/Sub payloads"
    );

    info!(addr = %metrics_addr, "Prometheus metrics endpoint started");
    Ok(())
}

/// Try to initialize metrics, logging any errors but not failing.
pub fn try_init_metrics(metrics_addr: SocketAddr) {
    if let Err(e) = init_metrics(metrics_addr) {
        error!(error = %e, "Failed to initialize metrics, continuing without metrics");
    }
}

/// Record how the middleware disposed of one request.
pub fn record_unwrap_outcome(outcome: &'static str) {
    counter!(names::REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record the size of a decoded payload.
pub fn record_payload_size(bytes: usize) {
    histogram!(names::PAYLOAD_BYTES).record(bytes as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Recording without an installed recorder must not panic.

    #[test]
    fn test_record_unwrap_outcome() {
        record_unwrap_outcome(outcome::PASSED_THROUGH);
        record_unwrap_outcome(outcome::FORWARDED);
        record_unwrap_outcome(outcome::REJECTED);
        record_unwrap_outcome(outcome::MALFORMED);
    }

    #[test]
    fn test_record_payload_size() {
        record_payload_size(0);
        record_payload_size(4096);
    }
}
