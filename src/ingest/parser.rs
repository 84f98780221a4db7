//! Record parser interface and construction from configuration.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use super::csv_parser::CsvParser;
use super::json_parser::JsonParser;
use super::record::Record;
use crate::error::ParseError;
use crate::{Error, Result};

/// Record name used when the configuration does not provide one.
pub const DEFAULT_RECORD_NAME: &str = "directory_monitor";

/// Turns the full decoded content of one file into records.
///
/// A parser either returns every record of the file or an error; partial
/// results are never surfaced.
pub trait RecordParser: Send + Sync + fmt::Debug {
    /// Short name of the data format, used in logs.
    fn format(&self) -> &'static str;

    /// Parse a complete file.
    ///
    /// # Errors
    ///
    /// Returns an error if the content is malformed.
    fn parse(&self, data: &[u8]) -> std::result::Result<Vec<Record>, ParseError>;
}

/// Options for the shipped parsers. Each parser ignores the options of the
/// other format.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// CSV: number of header rows; 0 names columns `column1..N`.
    pub header_row_count: usize,
    /// CSV: rows to skip before the header.
    pub skip_rows: usize,
    /// CSV: column delimiter.
    pub delimiter: char,
    /// CSV: lines starting with this character are ignored.
    pub comment: Option<char>,
    /// CSV: columns turned into tags instead of fields.
    pub tag_columns: Vec<String>,
    /// CSV: column holding the record name.
    pub measurement_column: Option<String>,
    /// Fixed record name for every record.
    pub name_override: Option<String>,
    /// JSON: key holding the record name.
    pub name_key: Option<String>,
    /// JSON: keys turned into tags.
    pub tag_keys: Vec<String>,
    /// JSON: string keys kept as fields.
    pub string_fields: Vec<String>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            header_row_count: 1,
            skip_rows: 0,
            delimiter: ',',
            comment: None,
            tag_columns: Vec::new(),
            measurement_column: None,
            name_override: None,
            name_key: None,
            tag_keys: Vec::new(),
            string_fields: Vec::new(),
        }
    }
}

impl ParserConfig {
    /// Record name used when none is found in the data.
    #[must_use]
    pub fn default_name(&self) -> &str {
        self.name_override.as_deref().unwrap_or(DEFAULT_RECORD_NAME)
    }
}

/// Build the parser for a configured data format.
///
/// # Errors
///
/// Returns a configuration error for unknown formats or invalid options.
pub fn build_parser(data_format: &str, config: &ParserConfig) -> Result<Arc<dyn RecordParser>> {
    match data_format.trim().to_lowercase().as_str() {
        "csv" => Ok(Arc::new(CsvParser::new(config.clone())?)),
        "json" => Ok(Arc::new(JsonParser::new(config.clone()))),
        other => Err(Error::config(format!(
            "unsupported data_format '{other}', must be one of: csv, json"
        ))),
    }
}
