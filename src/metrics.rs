//! Prometheus metrics for the reconciler
//!
//! Registered in the default registry; scrape them with [`encode_metrics`].

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

lazy_static! {
    /// Histogram: permission write duration (seconds)
    pub static ref WRITE_DURATION: HistogramVec = register_histogram_vec!(
        "channelwarden_write_duration_seconds",
        "Duration of permission override writes",
        &["status"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .expect("Failed to create write_duration metric");

    /// Counter: reconciliation runs by trigger and aggregate status
    pub static ref RUNS: CounterVec = register_counter_vec!(
        "channelwarden_runs_total",
        "Reconciliation runs by trigger and status",
        &["trigger", "status"]
    )
    .expect("Failed to create runs metric");

    /// Counter: per-channel outcomes by action
    pub static ref CHANNEL_OUTCOMES: CounterVec = register_counter_vec!(
        "channelwarden_channel_outcomes_total",
        "Per-channel reconciliation outcomes by action",
        &["action"]
    )
    .expect("Failed to create channel_outcomes metric");

    /// Gauge: dispatches currently running
    pub static ref INFLIGHT_DISPATCHES: Gauge = register_gauge!(
        "channelwarden_inflight_dispatches",
        "Number of trigger dispatches currently running"
    )
    .expect("Failed to create inflight_dispatches metric");

    /// Gauge: daemon health status (1 = healthy, 0 = unhealthy)
    pub static ref HEALTH_STATUS: Gauge = register_gauge!(
        "channelwarden_health_status",
        "Daemon health status (1 = healthy, 0 = unhealthy)"
    )
    .expect("Failed to create health_status metric");
}

/// Record one permission write
pub fn record_write(status: &str, duration_secs: f64) {
    WRITE_DURATION
        .with_label_values(&[status])
        .observe(duration_secs);
}

/// Record a completed run
pub fn record_run(trigger: &str, status: &str) {
    RUNS.with_label_values(&[trigger, status]).inc();
}

/// Record one channel outcome
pub fn record_outcome(action: &str) {
    CHANNEL_OUTCOMES.with_label_values(&[action]).inc();
}

/// Set the number of in-flight dispatches
pub fn set_inflight_dispatches(count: usize) {
    INFLIGHT_DISPATCHES.set(count as f64);
}

/// Set health status
pub fn set_health_status(healthy: bool) {
    HEALTH_STATUS.set(if healthy { 1.0 } else { 0.0 });
}

/// Encode all metrics as Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        record_write("ok", 0.2);
        record_run("startup", "success");
        record_outcome("applied");
        set_inflight_dispatches(2);
        set_health_status(true);

        let output = encode_metrics();
        assert!(output.contains("channelwarden_write_duration_seconds"));
        assert!(output.contains("channelwarden_runs_total"));
        assert!(output.contains("channelwarden_channel_outcomes_total"));
    }
}
