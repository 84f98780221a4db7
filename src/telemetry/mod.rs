//! Logging and metrics.
//!
//! This module provides:
//! - `tracing` subscriber setup (plain text or JSON)
//! - Prometheus counters and gauges for the monitor

pub mod metrics;
mod observability;

pub use metrics::{gather_metrics, init_metrics};
pub use observability::{init_tracing, spans};
