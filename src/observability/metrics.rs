//! Metrics collection and exposition.
//!
//! # Metrics
//! - `filedock_requests_total` (counter): requests by method
//! - `filedock_responses_total` (counter): responses by status
//! - `filedock_request_duration_seconds` (histogram): latency distribution
//! - `filedock_throttled_total` (counter): rejected admissions by reason

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::security::RejectReason;

/// Start the Prometheus exposition endpoint. Must run inside the runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "failed to start metrics endpoint"),
    }
}

pub fn record_request(method: &str) {
    metrics::counter!("filedock_requests_total", "method" => method.to_string()).increment(1);
}

pub fn record_response(status: u16, started: Instant) {
    metrics::counter!("filedock_responses_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("filedock_request_duration_seconds").record(started.elapsed().as_secs_f64());
}

pub fn record_throttled(reason: RejectReason) {
    let label = match reason {
        RejectReason::RateExceeded => "rate",
        RejectReason::TooManyActive => "active",
    };
    metrics::counter!("filedock_throttled_total", "reason" => label).increment(1);
}
