//! Prometheus metrics for balance-ledger.
//!
//! Ledger metrics live in the default `prometheus` registry. HTTP request
//! metrics from `service_core::middleware::metrics` go through the `metrics`
//! facade and are rendered by the recorder installed in [`init_metrics`].

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

/// Handle to the recorder behind the HTTP middleware metrics.
static HTTP_METRICS: OnceLock<PrometheusHandle> = OnceLock::new();

/// Transition counter by operation and status (ok, rejected, error).
pub static TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ledger_transitions_total",
        "Total number of ledger transitions",
        &["operation", "status"]
    )
    .expect("Failed to register transitions_total")
});

/// Transition duration histogram by operation.
pub static TRANSITION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "ledger_transition_duration_seconds",
        "Ledger transition duration in seconds",
        &["operation"],
        vec![0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register transition_duration")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ledger_errors_total",
        "Total number of errors by type",
        &["error_type"]  // insufficient_funds, store_error, partial_transfer, etc.
    )
    .expect("Failed to register errors_total")
});

/// Unlocks whose requested amount exceeded the locked balance.
pub static UNLOCK_CLAMPED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "ledger_unlock_clamped_total",
        "Total number of unlocks clamped to the locked balance"
    )
    .expect("Failed to register unlock_clamped_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "ledger_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics and install the HTTP metrics recorder.
///
/// Safe to call more than once; only the first call installs the recorder.
pub fn init_metrics() {
    HTTP_METRICS.get_or_init(install_http_recorder);
    Lazy::force(&TRANSITIONS_TOTAL);
    Lazy::force(&TRANSITION_DURATION);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&UNLOCK_CLAMPED_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Record the outcome of one transition.
pub fn record_transition(operation: &str, status: &str) {
    TRANSITIONS_TOTAL
        .with_label_values(&[operation, status])
        .inc();
}

/// Record an error by type.
pub fn record_error(error_type: &str) {
    ERRORS_TOTAL.with_label_values(&[error_type]).inc();
}

fn install_http_recorder() -> PrometheusHandle {
    PrometheusBuilder::new().install_recorder().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Metrics recorder already installed, HTTP metrics not exported");
        PrometheusBuilder::new().build_recorder().handle()
    })
}

/// Get ledger and HTTP metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut output = encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default();

    if let Some(handle) = HTTP_METRICS.get() {
        output.push_str(&handle.render());
    }
    output
}
