use std::fmt;

use chrono::NaiveDateTime;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::schema::Schema;

/// Default sampling temperature: strict, repeatable extraction.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// A free-text task description plus the fields wanted from it.
#[derive(Debug, Clone)]
pub struct TaskFieldRequest {
    text: String,
    schema: Schema,
    temperature: f32,
}

impl TaskFieldRequest {
    pub fn new(text: impl Into<String>, schema: Schema) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ExtractError::InvalidRequest(
                "task description must not be empty".to_string(),
            ));
        }
        Ok(Self {
            text,
            schema,
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    /// Higher values suit suggestion-style prompts; extraction wants 0.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }
}

/// Unparsed completion text. Usually holds one JSON object, possibly
/// wrapped in prose or code fences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModelResponse(String);

impl RawModelResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for RawModelResponse {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for RawModelResponse {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}

/// A normalized date/time field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DateValue {
    Resolved {
        at: NaiveDateTime,
        /// False for all-day tasks; `at` is then midnight of the date.
        has_time: bool,
        source: String,
    },
    /// The parser could not place the text; it is kept verbatim for review.
    Unresolved { source: String },
}

impl DateValue {
    pub fn source(&self) -> &str {
        match self {
            DateValue::Resolved { source, .. } | DateValue::Unresolved { source } => source,
        }
    }

    /// `YYYY-MM-DD` for all-day values, `YYYY-MM-DDTHH:MM:SS` otherwise.
    pub fn to_iso_string(&self) -> Option<String> {
        match self {
            DateValue::Resolved { at, has_time: true, .. } => {
                Some(at.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            DateValue::Resolved { at, has_time: false, .. } => {
                Some(at.date().format("%Y-%m-%d").to_string())
            }
            DateValue::Unresolved { .. } => None,
        }
    }
}

/// Typed value of one extracted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    List(Vec<String>),
    Date(DateValue),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateValue> {
        match self {
            FieldValue::Date(d) => Some(d),
            _ => None,
        }
    }
}

/// Why a field needs a second look.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// Missing from the model output; a default was substituted.
    Defaulted,
    /// Repaired by fallback or type coercion rather than matched directly.
    LowConfidence,
    /// Date text the parser could not resolve.
    Unresolved,
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteKind::Defaulted => write!(f, "defaulted"),
            NoteKind::LowConfidence => write!(f, "low confidence"),
            NoteKind::Unresolved => write!(f, "unresolved"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNote {
    pub field: String,
    pub kind: NoteKind,
    pub detail: String,
}

/// Canonical, schema-conformant extraction result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFields {
    values: Vec<(String, FieldValue)>,
    notes: Vec<FieldNote>,
}

impl TaskFields {
    pub(crate) fn new(values: Vec<(String, FieldValue)>, notes: Vec<FieldNote>) -> Self {
        Self { values, notes }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_text)
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(FieldValue::as_list)
    }

    pub fn date(&self, name: &str) -> Option<&DateValue> {
        self.get(name).and_then(FieldValue::as_date)
    }

    /// Fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn notes(&self) -> &[FieldNote] {
        &self.notes
    }

    pub fn notes_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldNote> + 'a {
        self.notes.iter().filter(move |n| n.field == field)
    }

    pub fn is_flagged(&self, field: &str, kind: NoteKind) -> bool {
        self.notes_for(field).any(|n| n.kind == kind)
    }

    pub fn needs_review(&self) -> bool {
        !self.notes.is_empty()
    }
}

impl Serialize for TaskFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("fields", &OrderedFields(&self.values))?;
        map.serialize_entry("notes", &self.notes)?;
        map.end()
    }
}

struct OrderedFields<'a>(&'a [(String, FieldValue)]);

impl Serialize for OrderedFields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
