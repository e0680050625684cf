//! Metrics collection and Prometheus exporter for genquota.
//!
//! This module provides metrics instrumentation for the usage-limit system,
//! including admission decisions, commit outcomes, cache effectiveness, and
//! store latency.

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize Prometheus metrics exporter.
///
/// Starts an HTTP server on the given address to expose metrics.
/// Returns an error message if binding fails.
pub fn init_prometheus(listen: &str) -> Result<(), String> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| format!("invalid metrics listen address: {}", e))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("failed to install prometheus exporter: {}", e))?;

    Ok(())
}

// ============================================================================
// Metric Names
// ============================================================================

/// Total admission checks that allowed the request.
pub const ADMISSION_ALLOWED_TOTAL: &str = "genquota_admission_allowed_total";
/// Total admission checks that rejected the request, labelled by reason.
pub const ADMISSION_REJECTED_TOTAL: &str = "genquota_admission_rejected_total";
/// Total successful consumption commits.
pub const COMMITS_TOTAL: &str = "genquota_commits_total";
/// Total commits whose durable write failed (under-counted usage).
pub const COMMIT_FAILURES_TOTAL: &str = "genquota_commit_failures_total";
/// Usage cache hits.
pub const CACHE_HITS_TOTAL: &str = "genquota_cache_hits_total";
/// Usage cache misses.
pub const CACHE_MISSES_TOTAL: &str = "genquota_cache_misses_total";
/// Store operation duration histogram (seconds), labelled by operation.
pub const STORE_OP_DURATION_SECONDS: &str = "genquota_store_op_duration_seconds";
/// Store operations that exceeded the slow threshold, labelled by operation.
pub const SLOW_STORE_OPS_TOTAL: &str = "genquota_slow_store_ops_total";
/// Requests refused by the fixed-window rate limiter, labelled by scope.
pub const RATE_LIMITED_TOTAL: &str = "genquota_rate_limited_total";

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record an admission check that allowed the request.
#[inline]
pub fn record_admission_allowed() {
    counter!(ADMISSION_ALLOWED_TOTAL).increment(1);
}

/// Record an admission check that rejected the request.
#[inline]
pub fn record_admission_rejected(reason: &'static str) {
    counter!(ADMISSION_REJECTED_TOTAL, "reason" => reason).increment(1);
}

/// Record a successful consumption commit.
#[inline]
pub fn record_commit() {
    counter!(COMMITS_TOTAL).increment(1);
}

/// Record a commit whose durable write failed.
#[inline]
pub fn record_commit_failure() {
    counter!(COMMIT_FAILURES_TOTAL).increment(1);
}

/// Record a usage cache hit.
#[inline]
pub fn record_cache_hit() {
    counter!(CACHE_HITS_TOTAL).increment(1);
}

/// Record a usage cache miss.
#[inline]
pub fn record_cache_miss() {
    counter!(CACHE_MISSES_TOTAL).increment(1);
}

/// Record the duration of a store operation.
#[inline]
pub fn record_store_op(operation: &'static str, elapsed: Duration) {
    histogram!(STORE_OP_DURATION_SECONDS, "operation" => operation).record(elapsed.as_secs_f64());
}

/// Record a store operation that exceeded the slow threshold.
#[inline]
pub fn record_slow_store_op(operation: &'static str) {
    counter!(SLOW_STORE_OPS_TOTAL, "operation" => operation).increment(1);
}

/// Record a request refused by the rate limiter.
#[inline]
pub fn record_rate_limited(scope: &'static str) {
    counter!(RATE_LIMITED_TOTAL, "scope" => scope).increment(1);
}
