//! Configuration settings and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::ingest::ParserConfig;
use crate::{Error, Result};

/// Name of the error directory created under the watched directory when
/// error relocation is enabled without an explicit target.
pub const DEFAULT_ERROR_DIR_NAME: &str = "dirmon_error";

/// Documented sample configuration, printed by `dirmon --sample-config`.
pub const SAMPLE_CONFIG: &str = r#"## The directory to monitor and read files from.
directory = ""

## The directory to move finished files to.
finished_directory = ""

## Whether or not to move files that error out to an error directory.
# use_error_directory = false

## The directory to move files to upon file error, given that
## 'use_error_directory' is enabled. If not given, one is created under
## 'directory'.
# error_directory = ""

## The interval at which to check the directory for new files.
# monitor_interval = "50ms"

## How long a file must sit untouched in the directory before it is picked
## up. Raise this when large files are copied in slowly.
# directory_duration_threshold = "50ms"

## Character encoding of the file contents. utf-8 content is passed through
## as is; for the utf-16 encodings, invalid sequences are replaced with the
## unicode replacement character.
##   utf-8 (default), utf-16le, utf-16be
# character_encoding = "utf-8"

## Regular expressions for the only file names to ingest. Empty means all.
# files_to_monitor = [".*\\.csv"]

## Regular expressions for file names to skip.
# files_to_ignore = ["\\.DS_Store"]

## Maximum number of records handed downstream but not yet confirmed.
# max_buffered_metrics = 1000

## Maximum number of files processed at once.
# max_concurrent_files = 3000

## Data format of the files: csv or json.
data_format = "csv"

# [parser]
# header_row_count = 1
# tag_columns = []
# name_key = ""
"#;

/// Main configuration for the directory monitor.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory to watch for new files.
    pub directory: PathBuf,

    /// Directory that successfully ingested files are moved to.
    pub finished_directory: PathBuf,

    /// Move files that fail to ingest to an error directory.
    pub use_error_directory: bool,

    /// Explicit error directory. Derived from `directory` when unset.
    pub error_directory: Option<PathBuf>,

    /// Character encoding of plain (non-gzip) files.
    pub character_encoding: String,

    /// File name patterns to ingest; empty means every file.
    pub files_to_monitor: Vec<String>,

    /// File name patterns to skip.
    pub files_to_ignore: Vec<String>,

    /// Capacity of the flow-control gate.
    pub max_buffered_metrics: usize,

    /// Maximum number of files in flight.
    pub max_concurrent_files: usize,

    /// Delay between directory scans.
    #[serde(deserialize_with = "humantime_duration::deserialize")]
    pub monitor_interval: Duration,

    /// Minimum idle time since last access before a file is read.
    #[serde(deserialize_with = "humantime_duration::deserialize")]
    pub directory_duration_threshold: Duration,

    /// Data format of the files (`csv` or `json`).
    pub data_format: String,

    /// Options passed to the record parser.
    pub parser: ParserConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            finished_directory: PathBuf::new(),
            use_error_directory: false,
            error_directory: None,
            character_encoding: "utf-8".to_string(),
            files_to_monitor: Vec::new(),
            files_to_ignore: Vec::new(),
            max_buffered_metrics: 1000,
            max_concurrent_files: 3000,
            monitor_interval: Duration::from_millis(50),
            directory_duration_threshold: Duration::from_millis(50),
            data_format: "csv".to_string(),
            parser: ParserConfig::default(),
        }
    }
}

impl Config {
    /// Create a configuration for the given directories with defaults.
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>, finished_directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            finished_directory: finished_directory.into(),
            ..Default::default()
        }
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read '{}': {e}", path.display()))
        })?;
        Self::from_toml(&raw)
            .map_err(|e| Error::config(format!("invalid config '{}': {e}", path.display())))
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has unknown keys.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(e.to_string()))
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() || self.finished_directory.as_os_str().is_empty()
        {
            return Err(Error::config(
                "missing one of the required options: directory, finished_directory",
            ));
        }

        if self.max_buffered_metrics == 0 {
            return Err(Error::config("max_buffered_metrics cannot be 0"));
        }

        if self.max_concurrent_files == 0 {
            return Err(Error::config("max_concurrent_files cannot be 0"));
        }

        if self.monitor_interval.is_zero() {
            return Err(Error::config("monitor_interval cannot be 0"));
        }

        Ok(())
    }

    /// Resolve where failed files go, if anywhere.
    #[must_use]
    pub fn error_directory_path(&self) -> Option<PathBuf> {
        if !self.use_error_directory {
            return None;
        }
        Some(
            self.error_directory
                .clone()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| self.directory.join(DEFAULT_ERROR_DIR_NAME)),
        )
    }
}

mod humantime_duration {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
