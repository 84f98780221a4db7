//! Directory monitoring: scanning, settle detection, claiming, flow control
//! and per-file processing.
//!
//! This module provides:
//! - Regex include/exclude filtering of file names
//! - Settle detection based on last access time
//! - An in-use registry guaranteeing one worker per path
//! - A flow-control gate released by downstream delivery reports
//! - The poll loop, file workers and the [`DirectoryMonitor`] controller

mod controller;
mod filter;
mod gate;
mod poller;
mod registry;
mod settle;
mod stats;
mod worker;

pub use controller::DirectoryMonitor;
pub use filter::FileFilter;
pub use gate::FlowGate;
pub use poller::{scan_directory, CandidateFile, Poller};
pub use registry::{Claim, InUseRegistry};
pub use settle::{is_settled, last_touched};
pub use stats::{MonitorStats, MonitorStatsSnapshot};
pub use worker::{
    is_compressed, read_file_to_records, relocate, FileOutcome, FileWorker, COMPRESSED_EXTENSION,
};
