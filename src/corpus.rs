//! Records and corpus loading.
//!
//! A [`Record`] maps field names to text. Text fields are scored; every other
//! field is metadata usable as a filter. A record's identity is its position
//! in the corpus, which is also its row in every derived matrix.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StrataError};

/// A single corpus record: field name → value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: HashMap<String, String>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(field, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Record {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Set a field, consuming and returning the record.
    pub fn with_field<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Whether the record has the field.
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// All fields of the record.
    pub fn fields(&self) -> &HashMap<String, String> {
        &self.fields
    }

    /// Join the given text fields with single spaces. Missing fields count as
    /// empty text.
    pub fn combined_text(&self, text_fields: &[String]) -> String {
        text_fields
            .iter()
            .map(|f| self.get(f).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<HashMap<String, String>> for Record {
    fn from(fields: HashMap<String, String>) -> Self {
        Record { fields }
    }
}

/// Read a corpus from a local JSON file.
///
/// Two layouts are accepted: a flat array of record objects, or an array of
/// groups shaped like `{"course": "...", "documents": [...]}`. Grouped
/// documents are flattened in order and each one receives the group's
/// `course` value.
pub fn load_corpus<P: AsRef<Path>>(path: P) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let value: Value = serde_json::from_str(&content)?;
    parse_corpus(&value)
}

/// Interpret an already-parsed JSON document as a corpus.
pub fn parse_corpus(value: &Value) -> Result<Vec<Record>> {
    let items = value.as_array().ok_or_else(|| {
        StrataError::configuration("corpus JSON must be an array of records or course groups")
    })?;

    let mut records = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let object = item.as_object().ok_or_else(|| {
            StrataError::configuration(format!("corpus entry {i} is not a JSON object"))
        })?;

        match object.get("documents") {
            Some(Value::Array(documents)) => {
                let course = object.get("course").map(scalar_to_string).unwrap_or_default();
                for (j, document) in documents.iter().enumerate() {
                    let mut record = record_from_value(document).ok_or_else(|| {
                        StrataError::configuration(format!(
                            "document {j} of group {i} is not a JSON object"
                        ))
                    })?;
                    record.fields.insert("course".to_string(), course.clone());
                    records.push(record);
                }
            }
            _ => {
                // record_from_value only fails on non-objects, checked above
                if let Some(record) = record_from_value(item) {
                    records.push(record);
                }
            }
        }
    }

    Ok(records)
}

fn record_from_value(value: &Value) -> Option<Record> {
    let object = value.as_object()?;
    Some(Record {
        fields: object
            .iter()
            .map(|(k, v)| (k.clone(), scalar_to_string(v)))
            .collect(),
    })
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
