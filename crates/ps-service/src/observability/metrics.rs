//! Metrics definitions for the PS service.
//!
//! All metrics follow Prometheus naming conventions with a `ps_` prefix,
//! `_total` for counters, `_seconds` for duration histograms.
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `event`: 3 values (muteState, connectedCount, state-all)
//! - `status`: 2 values (success, error)
//! - `operation`: bounded by code (auth, session_claim)
//!
//! Participant ids are never used as labels.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus metrics recorder and return the handle for
/// serving metrics over HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns an error if the recorder fails to install (e.g., already
/// installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ps_upstream_request".to_string()),
            &[0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000],
        )
        .map_err(|e| format!("Failed to set upstream request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record one position ingestion.
///
/// Metric: `ps_position_updates_total`
pub fn record_position_update() {
    counter!("ps_position_updates_total").increment(1);
}

/// Record one speaking-flag ingestion.
///
/// Metric: `ps_speaking_updates_total`
pub fn record_speaking_update() {
    counter!("ps_speaking_updates_total").increment(1);
}

/// Record one push event handed to a transport handle.
///
/// Metric: `ps_push_events_total`, label `event`
pub fn record_push_event(event: &'static str) {
    counter!("ps_push_events_total", "event" => event).increment(1);
}

/// Track the connected-set cardinality.
///
/// Metric: `ps_connected_participants`
pub fn record_connected_count(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("ps_connected_participants").set(count as f64);
}

/// Record an auth/session operation outcome and its upstream latency.
///
/// Metrics: `ps_upstream_requests_total`, `ps_upstream_request_duration_seconds`
/// Labels: `operation`, `status`
pub fn record_upstream_request(operation: &'static str, success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };
    counter!(
        "ps_upstream_requests_total",
        "operation" => operation,
        "status" => status
    )
    .increment(1);
    histogram!(
        "ps_upstream_request_duration_seconds",
        "operation" => operation,
        "status" => status
    )
    .record(duration.as_secs_f64());
}

/// Record a one-shot session claim outcome.
///
/// Metric: `ps_session_claims_total`, label `status`
pub fn record_session_claim(success: bool) {
    let status = if success { "success" } else { "error" };
    counter!("ps_session_claims_total", "status" => status).increment(1);
}
