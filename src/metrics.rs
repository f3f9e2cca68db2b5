//! Prometheus metrics for application observability.
//!
//! Metrics are exposed via a dedicated HTTP listener (`METRICS_PORT`) so the
//! public API port never serves them.
//!
//! # Available Metrics
//!
//! ## Counters
//! - `consult_rate_limited_total` - Requests rejected by a rate-limit policy (label: policy)
//! - `consult_submissions_total` - Accepted submissions (label: kind)
//! - `consult_emails_total` - Email dispatch outcomes (labels: kind, outcome)
//!
//! ## Histograms
//! - `consult_request_duration_seconds` - Request duration (labels: endpoint, method, status)
//!
//! ## Gauges
//! - `consult_rate_limit_keys` - Client keys tracked by the limiter after the last sweep
//!
//! # Usage
//!
//! ```rust,ignore
//! use consult_api::metrics::{try_init_metrics, record_submission};
//!
//! try_init_metrics(addr);
//! record_submission("contact");
//! ```

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info};

/// Metric names as constants for consistency.
pub mod names {
    pub const RATE_LIMITED_TOTAL: &str = "consult_rate_limited_total";
    pub const SUBMISSIONS_TOTAL: &str = "consult_submissions_total";
    pub const EMAILS_TOTAL: &str = "consult_emails_total";
    pub const REQUEST_DURATION_SECONDS: &str = "consult_request_duration_seconds";
    pub const RATE_LIMIT_KEYS: &str = "consult_rate_limit_keys";
}

/// Initialize the Prometheus metrics exporter.
///
/// Sets up metric descriptions and starts the Prometheus HTTP listener on
/// `metrics_addr`.
pub fn init_metrics(metrics_addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        names::RATE_LIMITED_TOTAL,
        "Total number of requests rejected by rate limiting"
    );
    describe_counter!(
        names::SUBMISSIONS_TOTAL,
        "Total number of accepted form submissions"
    );
    describe_counter!(
        names::EMAILS_TOTAL,
        "Total number of email dispatch attempts by outcome"
    );

    describe_histogram!(
        names::REQUEST_DURATION_SECONDS,
        "HTTP request duration in seconds"
    );

    describe_gauge!(
        names::RATE_LIMIT_KEYS,
        "Client keys tracked by the rate limiter"
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

// =============================================================================
// Counter Recording Functions
// =============================================================================

/// Record a request rejected by the named rate-limit policy.
pub fn record_rate_limited(policy: &'static str) {
    counter!(names::RATE_LIMITED_TOTAL, "policy" => policy).increment(1);
}

/// Record an accepted submission (`contact`, `newsletter`, `registration`).
pub fn record_submission(kind: &'static str) {
    counter!(names::SUBMISSIONS_TOTAL, "kind" => kind).increment(1);
}

/// Record the outcome of one email dispatch (`sent`, `failed`, `timeout`).
pub fn record_email(kind: &'static str, outcome: &'static str) {
    counter!(names::EMAILS_TOTAL, "kind" => kind, "outcome" => outcome).increment(1);
}

// =============================================================================
// Histogram Recording Functions
// =============================================================================

/// Record HTTP request duration.
pub fn record_request_duration(endpoint: &str, method: &str, status: &str, duration_secs: f64) {
    histogram!(names::REQUEST_DURATION_SECONDS, "endpoint" => endpoint.to_string(), "method" => method.to_string(), "status" => status.to_string())
        .record(duration_secs);
}

// =============================================================================
// Gauge Recording Functions
// =============================================================================

pub fn set_rate_limit_keys(count: usize) {
    gauge!(names::RATE_LIMIT_KEYS).set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    // Recording without an installed recorder is a no-op; these only check
    // that nothing panics.

    #[test]
    fn test_record_counters() {
        record_rate_limited("submit");
        record_submission("contact");
        record_email("contact_notification", "sent");
    }

    #[test]
    fn test_record_request_duration() {
        record_request_duration("/api/contact", "POST", "201", 0.1);
    }

    #[test]
    fn test_set_rate_limit_keys() {
        set_rate_limit_keys(0);
        set_rate_limit_keys(42);
    }
}
