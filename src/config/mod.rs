//! Configuration management for dirmon.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables
//! - TOML configuration file (lowest priority)

mod settings;

pub use settings::{Config, DEFAULT_ERROR_DIR_NAME, SAMPLE_CONFIG};
