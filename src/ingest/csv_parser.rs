//! CSV record parser.

use chrono::{DateTime, Utc};

use super::parser::{ParserConfig, RecordParser};
use super::record::{FieldValue, Record};
use crate::error::ParseError;
use crate::{Error, Result};

const FORMAT: &str = "csv";

/// Parses delimited text with optional header rows.
#[derive(Debug, Clone)]
pub struct CsvParser {
    config: ParserConfig,
    delimiter: u8,
    comment: Option<u8>,
}

impl CsvParser {
    /// Create a CSV parser.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the delimiter or comment character is
    /// not a single ASCII character.
    pub fn new(config: ParserConfig) -> Result<Self> {
        let delimiter = ascii_byte(config.delimiter, "delimiter")?;
        let comment = config
            .comment
            .map(|c| ascii_byte(c, "comment"))
            .transpose()?;
        Ok(Self {
            config,
            delimiter,
            comment,
        })
    }

    fn header(&self, rows: &[csv::StringRecord], width: usize) -> Vec<String> {
        if rows.is_empty() {
            return (1..=width).map(|i| format!("column{i}")).collect();
        }

        // Multiple header rows are joined column-wise
        (0..width)
            .map(|col| {
                rows.iter()
                    .filter_map(|row| row.get(col))
                    .map(str::trim)
                    .collect::<String>()
            })
            .collect()
    }

    fn build_record(
        &self,
        header: &[String],
        row: &csv::StringRecord,
        timestamp: DateTime<Utc>,
    ) -> Record {
        let mut record = Record::new(self.config.default_name());
        record.timestamp = timestamp;

        for (name, raw) in header.iter().zip(row.iter()) {
            let value = raw.trim();
            if self.config.measurement_column.as_deref() == Some(name.as_str()) {
                if !value.is_empty() {
                    record.name = value.to_string();
                }
                continue;
            }
            if self.config.tag_columns.iter().any(|t| t == name) {
                record.tags.insert(name.clone(), value.to_string());
                continue;
            }
            if value.is_empty() {
                continue;
            }
            record.fields.insert(name.clone(), FieldValue::infer(value));
        }
        record
    }
}

impl RecordParser for CsvParser {
    fn format(&self) -> &'static str {
        FORMAT
    }

    fn parse(&self, data: &[u8]) -> std::result::Result<Vec<Record>, ParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .comment(self.comment)
            .from_reader(data);

        let mut rows = reader.records();
        for _ in 0..self.config.skip_rows {
            if rows.next().transpose().map_err(invalid)?.is_none() {
                return Ok(Vec::new());
            }
        }

        let mut header_rows = Vec::with_capacity(self.config.header_row_count);
        for _ in 0..self.config.header_row_count {
            match rows.next().transpose().map_err(invalid)? {
                Some(row) => header_rows.push(row),
                None => return Ok(Vec::new()),
            }
        }

        let timestamp = Utc::now();
        let mut header: Option<Vec<String>> = None;
        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(invalid)?;
            let width = header_rows.first().map_or(row.len(), csv::StringRecord::len);
            let columns = header.get_or_insert_with(|| self.header(&header_rows, width));

            if row.len() != columns.len() {
                return Err(ParseError::ColumnMismatch {
                    line: row.position().map_or(0, csv::Position::line),
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            records.push(self.build_record(columns, &row, timestamp));
        }

        Ok(records)
    }
}

fn ascii_byte(c: char, option: &str) -> Result<u8> {
    u8::try_from(c)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| Error::config(format!("csv {option} must be a single ASCII character")))
}

#[allow(clippy::needless_pass_by_value)]
fn invalid(e: csv::Error) -> ParseError {
    ParseError::invalid(FORMAT, e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::DEFAULT_RECORD_NAME;

    fn parser(config: ParserConfig) -> CsvParser {
        CsvParser::new(config).unwrap()
    }

    #[test]
    fn test_header_and_rows() {
        let records = parser(ParserConfig::default())
            .parse(b"thing,color\nsky,blue\ngrass,green\nclifford,red\n")
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name, DEFAULT_RECORD_NAME);
        assert_eq!(
            records[0].field("thing"),
            Some(&FieldValue::String("sky".to_string()))
        );
        assert_eq!(
            records[2].field("color"),
            Some(&FieldValue::String("red".to_string()))
        );
    }

    #[test]
    fn test_typed_values_and_tags() {
        let config = ParserConfig {
            tag_columns: vec!["host".to_string()],
            measurement_column: Some("kind".to_string()),
            ..Default::default()
        };
        let records = parser(config)
            .parse(b"kind,host,load,count,up\ncpu,web-1,0.75,4,true\n")
            .unwrap();

        let record = &records[0];
        assert_eq!(record.name, "cpu");
        assert_eq!(record.tag("host"), Some("web-1"));
        assert_eq!(record.field("load"), Some(&FieldValue::Float(0.75)));
        assert_eq!(record.field("count"), Some(&FieldValue::Integer(4)));
        assert_eq!(record.field("up"), Some(&FieldValue::Boolean(true)));
        assert!(record.field("kind").is_none());
    }

    #[test]
    fn test_no_header_rows() {
        let config = ParserConfig {
            header_row_count: 0,
            ..Default::default()
        };
        let records = parser(config).parse(b"1,2\n3,4\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].field("column2"), Some(&FieldValue::Integer(4)));
    }

    #[test]
    fn test_multiple_header_rows_and_skip() {
        let config = ParserConfig {
            skip_rows: 1,
            header_row_count: 2,
            delimiter: ';',
            ..Default::default()
        };
        let records = parser(config)
            .parse(b"exported by job 7\ntemp;hum\n_c;_pct\n21;40\n")
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field("temp_c"), Some(&FieldValue::Integer(21)));
        assert_eq!(records[0].field("hum_pct"), Some(&FieldValue::Integer(40)));
    }

    #[test]
    fn test_comment_lines_skipped() {
        let config = ParserConfig {
            comment: Some('#'),
            ..Default::default()
        };
        let records = parser(config).parse(b"# note\na,b\n1,2\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].field("a"), Some(&FieldValue::Integer(1)));
    }

    #[test]
    fn test_empty_input() {
        assert!(parser(ParserConfig::default()).parse(b"").unwrap().is_empty());
        assert!(parser(ParserConfig::default())
            .parse(b"only,header\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_column_mismatch_fails_whole_file() {
        let err = parser(ParserConfig::default())
            .parse(b"a,b\n1,2\n3,4,5\n")
            .unwrap_err();
        assert!(matches!(
            err,
            ParseError::ColumnMismatch {
                line: 3,
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn test_invalid_utf8_is_parse_error() {
        let err = parser(ParserConfig::default())
            .parse(b"a,b\n\xff\xfe,1\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::Invalid { format: "csv", .. }));
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let config = ParserConfig {
            delimiter: '§',
            ..Default::default()
        };
        assert!(CsvParser::new(config).is_err());
    }
}
