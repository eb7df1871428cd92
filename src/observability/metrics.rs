//! Metrics collection and exposition.
//!
//! # Metrics
//! - `storegate_connect_attempts_total` (counter): connect attempts by outcome
//! - `storegate_acquire_duration_seconds` (histogram): acquire latency by outcome
//! - `storegate_acquire_exhausted_total` (counter): retry budgets spent
//! - `storegate_configuration_errors_total` (counter): acquisitions refused for config gaps
//! - `storegate_releases_total` (counter): releases by outcome
//! - `storegate_open_handles` (gauge): handles currently open
//! - `storegate_admission_decisions_total` (counter): admitted / rejected
//! - `storegate_admission_evictions_total` (counter): keys evicted at capacity
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; with no recorder installed
//!   every call is a no-op, so tests need no setup

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connect_attempt(outcome: &'static str) {
    counter!("storegate_connect_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_acquire(outcome: &'static str, elapsed: Duration) {
    histogram!("storegate_acquire_duration_seconds", "outcome" => outcome).record(elapsed.as_secs_f64());
}

pub fn record_acquire_exhausted() {
    counter!("storegate_acquire_exhausted_total").increment(1);
}

pub fn record_configuration_error() {
    counter!("storegate_configuration_errors_total").increment(1);
}

pub fn record_release(outcome: &'static str) {
    counter!("storegate_releases_total", "outcome" => outcome).increment(1);
}

pub fn handle_opened() {
    gauge!("storegate_open_handles").increment(1.0);
}

pub fn handle_closed() {
    gauge!("storegate_open_handles").decrement(1.0);
}

pub fn record_admission(admitted: bool) {
    let decision = if admitted { "admitted" } else { "rejected" };
    counter!("storegate_admission_decisions_total", "decision" => decision).increment(1);
}

pub fn record_admission_eviction(count: usize) {
    counter!("storegate_admission_evictions_total").increment(count as u64);
}
