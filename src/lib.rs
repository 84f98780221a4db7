//! dirmon
//!
//! Watches a directory for files that have stopped changing, parses each one
//! into metric records, hands the records downstream through a bounded
//! flow-control gate, and moves the file to a finished or error directory.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod ingest;
pub mod monitor;
pub mod telemetry;

pub use config::Config;
pub use error::{Error, Result};
pub use monitor::DirectoryMonitor;
