//! JSON record parser.
//!
//! Accepts a single object or an array of objects per file. Nested objects
//! and arrays are flattened into `parent_child` / `parent_0` keys.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::parser::{ParserConfig, RecordParser};
use super::record::{FieldValue, Record};
use crate::error::ParseError;

const FORMAT: &str = "json";

/// Parses JSON documents into records.
#[derive(Debug, Clone)]
pub struct JsonParser {
    config: ParserConfig,
}

impl JsonParser {
    /// Create a JSON parser.
    #[must_use]
    pub const fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    fn build_record(&self, object: &Map<String, Value>, timestamp: DateTime<Utc>) -> Record {
        let mut record = Record::new(self.config.default_name());
        record.timestamp = timestamp;

        let mut flat = Vec::new();
        flatten("", object, &mut flat);

        for (key, value) in flat {
            if self.config.name_key.as_deref() == Some(key.as_str()) {
                if let Value::String(name) = value {
                    record.name = name.clone();
                }
                continue;
            }

            if self.config.tag_keys.iter().any(|k| *k == key) {
                let tag = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                record.tags.insert(key, tag);
                continue;
            }

            match value {
                Value::Bool(b) => {
                    record.fields.insert(key, FieldValue::Boolean(*b));
                }
                Value::Number(n) => {
                    let field = n
                        .as_i64()
                        .map(FieldValue::Integer)
                        .or_else(|| n.as_f64().map(FieldValue::Float));
                    if let Some(field) = field {
                        record.fields.insert(key, field);
                    }
                }
                Value::String(s) if self.config.string_fields.iter().any(|k| *k == key) => {
                    record.fields.insert(key, FieldValue::String(s.clone()));
                }
                _ => {}
            }
        }

        record
    }
}

impl RecordParser for JsonParser {
    fn format(&self) -> &'static str {
        FORMAT
    }

    fn parse(&self, data: &[u8]) -> std::result::Result<Vec<Record>, ParseError> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let document: Value = serde_json::from_slice(data)
            .map_err(|e| ParseError::invalid(FORMAT, e.to_string()))?;
        let timestamp = Utc::now();

        match document {
            Value::Object(object) => Ok(vec![self.build_record(&object, timestamp)]),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(object) => Ok(self.build_record(object, timestamp)),
                    _ => Err(ParseError::invalid(
                        FORMAT,
                        format!("array element {i} is not an object"),
                    )),
                })
                .collect(),
            _ => Err(ParseError::invalid(
                FORMAT,
                "top-level value must be an object or an array of objects",
            )),
        }
    }
}

/// Flatten nested objects and arrays into leaf `(key, value)` pairs.
fn flatten<'a>(prefix: &str, object: &'a Map<String, Value>, out: &mut Vec<(String, &'a Value)>) {
    for (key, value) in object {
        let key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}_{key}")
        };
        flatten_value(key, value, out);
    }
}

fn flatten_value<'a>(key: String, value: &'a Value, out: &mut Vec<(String, &'a Value)>) {
    match value {
        Value::Object(nested) => flatten(&key, nested, out),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(format!("{key}_{i}"), item, out);
            }
        }
        leaf => out.push((key, leaf)),
    }
}
