//! Error types and Result aliases for dirmon.
//!
//! Only configuration errors are fatal. Everything else is scoped to a single
//! file or a single scan cycle and ends up in the logs and counters.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using dirmon's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dirmon operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Downstream sink error.
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Transient errors raised while listing or stat-ing the watched directory.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The watched directory could not be listed.
    #[error("failed to list directory '{path}': {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single entry could not be inspected.
    #[error("failed to stat '{path}': {source}")]
    StatFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure confined to reading and parsing one file.
#[derive(Error, Debug)]
pub enum IngestError {
    /// The file could not be opened.
    #[error("failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The content could not be decompressed or decoded.
    #[error("failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The parser rejected the content.
    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// The blocking read task did not complete.
    #[error("read task for '{path}' failed: {reason}")]
    Task { path: PathBuf, reason: String },
}

/// Failure to move a file out of the watched directory.
#[derive(Error, Debug)]
#[error("failed to move '{from}' to '{to}': {source}")]
pub struct RelocationError {
    pub from: PathBuf,
    pub to: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Errors reported by a record parser.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Content is not valid for the data format.
    #[error("invalid {format} data: {reason}")]
    Invalid { format: &'static str, reason: String },

    /// A row does not line up with the header.
    #[error("line {line}: expected {expected} columns, found {found}")]
    ColumnMismatch {
        line: u64,
        expected: usize,
        found: usize,
    },
}

impl ParseError {
    /// Create an invalid-data error.
    pub fn invalid(format: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            format,
            reason: reason.into(),
        }
    }
}

/// Errors reported by a tracking sink.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The downstream consumer has gone away.
    #[error("downstream consumer closed")]
    Closed,
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
