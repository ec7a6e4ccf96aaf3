//! Central metrics registry and metric definitions
//!
//! Metrics are registered lazily on first access using once_cell::Lazy.

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

/// Total number of procedure calls by caller role and status
pub static PROCEDURE_CALLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dbhammer_procedure_calls_total",
        "Total number of synthesized procedure calls",
        &["caller", "status"]
    )
    .expect("Failed to register procedure call counter")
});

/// Procedure call duration histogram
pub static PROCEDURE_CALL_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dbhammer_procedure_call_duration_seconds",
        "Procedure call duration in seconds",
        &["caller"],
        // Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register procedure call duration histogram")
});

/// Iterations where no procedure could be selected
pub static SELECTION_MISSES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dbhammer_selection_misses_total",
        "Worker iterations without an eligible procedure"
    )
    .expect("Failed to register selection miss counter")
});

/// Workers currently in the Running state
pub static ACTIVE_WORKERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dbhammer_active_workers", "Number of running workers")
        .expect("Failed to register active workers gauge")
});

/// Record the outcome of one procedure call.
pub fn record_call(caller: &str, status: &str, duration_secs: f64) {
    PROCEDURE_CALLS.with_label_values(&[caller, status]).inc();
    PROCEDURE_CALL_DURATION
        .with_label_values(&[caller])
        .observe(duration_secs);
}

/// Render every registered metric in the Prometheus text format.
pub fn render() -> String {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_calls_show_up_in_rendered_output() {
        record_call("User", "success", 0.02);
        SELECTION_MISSES.inc();
        ACTIVE_WORKERS.set(0);

        let text = render();
        assert!(text.contains("dbhammer_procedure_calls_total"));
        assert!(text.contains("dbhammer_selection_misses_total"));
    }
}
