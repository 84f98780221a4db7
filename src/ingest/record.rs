//! Structured records produced by parsers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
}

impl FieldValue {
    /// Infer the narrowest type for a raw textual value.
    #[must_use]
    pub fn infer(raw: &str) -> Self {
        if let Ok(v) = raw.parse::<i64>() {
            return Self::Integer(v);
        }
        // "nan" and "inf" parse as floats but are almost always text
        if let Ok(v) = raw.parse::<f64>() {
            if v.is_finite() {
                return Self::Float(v);
            }
        }
        match raw {
            "true" | "TRUE" | "True" => Self::Boolean(true),
            "false" | "FALSE" | "False" => Self::Boolean(false),
            _ => Self::String(raw.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// One structured record, the unit handed to the tracking sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Measurement name.
    pub name: String,
    /// Indexed string attributes.
    pub tags: BTreeMap<String, String>,
    /// Typed values.
    pub fields: BTreeMap<String, FieldValue>,
    /// Time the record was produced.
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// Create an empty record stamped with the current time.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Add a tag.
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Add a field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Look up a field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Look up a tag.
    #[must_use]
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}
