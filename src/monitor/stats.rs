//! File counters for one monitor.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::telemetry::metrics::{FILES_DROPPED, FILES_PROCESSED};

/// Monotonic file counters. Each increment is mirrored into the process-wide
/// Prometheus counters, labelled by watched directory.
#[derive(Debug)]
pub struct MonitorStats {
    directory: String,
    files_processed: AtomicU64,
    files_dropped: AtomicU64,
}

impl MonitorStats {
    /// Create new stats tracker for a watched directory.
    #[must_use]
    pub fn new(directory: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            directory: directory.into(),
            files_processed: AtomicU64::new(0),
            files_dropped: AtomicU64::new(0),
        })
    }

    /// Record a file that was fully ingested.
    pub fn file_processed(&self) {
        self.files_processed.fetch_add(1, Ordering::Relaxed);
        FILES_PROCESSED.with_label_values(&[self.directory.as_str()]).inc();
    }

    /// Record a file that failed to ingest.
    pub fn file_dropped(&self) {
        self.files_dropped.fetch_add(1, Ordering::Relaxed);
        FILES_DROPPED.with_label_values(&[self.directory.as_str()]).inc();
    }

    /// Get snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> MonitorStatsSnapshot {
        MonitorStatsSnapshot {
            files_processed: self.files_processed.load(Ordering::Relaxed),
            files_dropped: self.files_dropped.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of monitor stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MonitorStatsSnapshot {
    pub files_processed: u64,
    pub files_dropped: u64,
}
