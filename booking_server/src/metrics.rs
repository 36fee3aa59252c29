//! Prometheus metrics for the authentication server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener when
//! `METRICS_BIND` is set. Without an installed exporter every recording call
//! is a no-op.
//!
//! # Metrics
//!
//! - `http_requests_total{method,path,status}`
//! - `http_request_duration_ms{method,path}`
//! - `auth_operations_total{operation,outcome}`
//! - `accounts_locked_total`
//! - `reset_tokens_issued_total`
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use booking_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::http_requests_total("POST", "/api/v1/entrance/login", 200);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Auth Metrics
// ============================================================================

/// Count one auth operation by outcome (`ok` or an error code).
pub fn auth_operations_total(operation: &'static str, outcome: &'static str) {
    metrics::counter!("auth_operations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}

/// Count a login rejected because the account is locked.
pub fn accounts_locked_total() {
    metrics::counter!("accounts_locked_total").increment(1);
}

/// Count a reset token handed to the notifier.
pub fn reset_tokens_issued_total() {
    metrics::counter!("reset_tokens_issued_total").increment(1);
}
