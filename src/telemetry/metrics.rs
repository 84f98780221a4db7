//! Prometheus metrics definitions.

use once_cell::sync::Lazy;
use prometheus::{
    register_int_counter_vec, register_int_gauge_vec, Encoder, IntCounterVec, IntGaugeVec,
    TextEncoder,
};

/// Files fully ingested and moved to the finished directory.
pub static FILES_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dirmon_files_processed_total",
        "Total number of files ingested successfully",
        &["directory"]
    )
    .unwrap()
});

/// Files that failed to open, decode or parse.
pub static FILES_DROPPED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dirmon_files_dropped_total",
        "Total number of files dropped after an ingest error",
        &["directory"]
    )
    .unwrap()
});

/// Files claimed by a worker at the last poll.
pub static FILES_IN_USE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "dirmon_files_in_use",
        "Number of files currently being processed",
        &["directory"]
    )
    .unwrap()
});

/// Records handed downstream and not yet confirmed at the last poll.
pub static GATE_IN_FLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "dirmon_gate_in_flight",
        "Number of records awaiting delivery confirmation",
        &["directory"]
    )
    .unwrap()
});

/// Initialize all metrics.
pub fn init_metrics() {
    // Access lazy statics to register them
    let _ = &*FILES_PROCESSED;
    let _ = &*FILES_DROPPED;
    let _ = &*FILES_IN_USE;
    let _ = &*GATE_IN_FLIGHT;

    tracing::debug!("Prometheus metrics initialized");
}

/// Render every registered metric in the Prometheus text format.
#[must_use]
pub fn gather_metrics() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Refresh the occupancy gauges of one monitor.
#[allow(clippy::cast_possible_wrap)]
pub fn record_occupancy(directory: &str, in_use: usize, in_flight: usize) {
    FILES_IN_USE
        .with_label_values(&[directory])
        .set(in_use as i64);
    GATE_IN_FLIGHT
        .with_label_values(&[directory])
        .set(in_flight as i64);
}
