use std::collections::HashSet;

use chrono::{Local, NaiveDateTime, NaiveTime};
use log::{debug, warn};
use serde_json::Value;

use crate::date_parser::{has_time_component, DateParser, NaturalDateParser};
use crate::error::{ExtractError, Result};
use crate::json_locate::{locate_object, Located};
use crate::schema::{FieldKind, FieldSpec, Schema};
use crate::task::{DateValue, FieldNote, FieldValue, NoteKind, RawModelResponse, TaskFields};

/// Spellings of JSON null a model sometimes sends as a string. Anything
/// else is user text and goes through the date parser.
const NO_DATE: &[&str] = &["none", "null", "n/a"];

/// Turns a raw completion into schema-conformant `TaskFields`.
///
/// Only a missing JSON object is fatal. Every other anomaly is repaired
/// and recorded as a `FieldNote` so a reviewer can see what was guessed.
pub struct Normalizer {
    date_parser: Box<dyn DateParser>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::with_date_parser(Box::new(NaturalDateParser::new()))
    }

    pub fn with_date_parser(date_parser: Box<dyn DateParser>) -> Self {
        Self { date_parser }
    }

    /// Normalize against the local wall clock.
    pub fn normalize(&self, raw: &RawModelResponse, schema: &Schema) -> Result<TaskFields> {
        self.normalize_at(raw, schema, Local::now().naive_local())
    }

    /// Normalize with relative dates resolved against `reference`.
    pub fn normalize_at(
        &self,
        raw: &RawModelResponse,
        schema: &Schema,
        reference: NaiveDateTime,
    ) -> Result<TaskFields> {
        let object = match locate_object(raw.as_str()) {
            Located::Object(map) => map,
            Located::Unparseable { candidates, error } => {
                return Err(ExtractError::ExtractionFailed(format!(
                    "{} brace-delimited candidate(s) found but none is valid JSON ({})",
                    candidates, error
                )));
            }
            Located::NotFound => {
                return Err(ExtractError::ExtractionFailed(
                    "model output contains no JSON object".to_string(),
                ));
            }
        };

        for key in object.keys().filter(|k| schema.field(k).is_none()) {
            debug!("Ignoring key '{}' not declared in the schema", key);
        }

        let mut notes = Vec::new();
        let values = schema
            .fields()
            .iter()
            .map(|field| {
                let raw_value = object.get(&field.name).filter(|v| !v.is_null());
                let value = self.normalize_field(field, raw_value, reference, &mut notes);
                (field.name.clone(), value)
            })
            .collect();

        for note in &notes {
            match note.kind {
                NoteKind::Defaulted => debug!("{}: {} ({})", note.field, note.kind, note.detail),
                _ => warn!("{}: {} ({})", note.field, note.kind, note.detail),
            }
        }

        Ok(TaskFields::new(values, notes))
    }

    fn normalize_field(
        &self,
        field: &FieldSpec,
        value: Option<&Value>,
        reference: NaiveDateTime,
        notes: &mut Vec<FieldNote>,
    ) -> FieldValue {
        let mut note = |kind: NoteKind, detail: String| {
            notes.push(FieldNote {
                field: field.name.clone(),
                kind,
                detail,
            })
        };

        match &field.kind {
            FieldKind::ShortText => match value {
                None => {
                    note(NoteKind::Defaulted, "missing; using empty text".to_string());
                    FieldValue::Text(String::new())
                }
                Some(v) => {
                    let (text, coerced) = text_of(v);
                    if coerced {
                        note(NoteKind::LowConfidence, format!("expected a string, got {}", v));
                    }
                    FieldValue::Text(text)
                }
            },

            FieldKind::OptionalText => match value {
                None => FieldValue::Null,
                Some(v) => {
                    let (text, coerced) = text_of(v);
                    if coerced {
                        note(NoteKind::LowConfidence, format!("expected a string, got {}", v));
                    }
                    if text.is_empty() {
                        FieldValue::Null
                    } else {
                        FieldValue::Text(text)
                    }
                }
            },

            FieldKind::TextList => {
                let Some(v) = value else {
                    note(NoteKind::Defaulted, "missing; using empty list".to_string());
                    return FieldValue::List(Vec::new());
                };
                let (items, coerced) = list_of(v);
                if coerced {
                    note(NoteKind::LowConfidence, format!("expected an array of strings, got {}", v));
                }
                let (items, dropped) = clean_list(items, field.marker.as_deref());
                if !dropped.is_empty() {
                    note(
                        NoteKind::LowConfidence,
                        format!("dropped blank or duplicate entries: {:?}", dropped),
                    );
                }
                FieldValue::List(items)
            }

            FieldKind::Enum(legal) => {
                let Some(first) = legal.first() else {
                    return FieldValue::Null;
                };
                let Some(v) = value else {
                    note(NoteKind::Defaulted, format!("missing; using \"{}\"", first));
                    return FieldValue::Text(first.clone());
                };
                let (text, _) = text_of(v);
                match match_enum(&text, legal) {
                    Some(member) => FieldValue::Text(member.to_string()),
                    None => {
                        note(
                            NoteKind::LowConfidence,
                            format!("\"{}\" is not a legal value; using \"{}\"", text, first),
                        );
                        FieldValue::Text(first.clone())
                    }
                }
            }

            FieldKind::DateOrTimeExpression => {
                let Some(v) = value else {
                    return FieldValue::Null;
                };
                let (source, _) = text_of(v);
                if source.is_empty() || NO_DATE.contains(&source.to_lowercase().as_str()) {
                    return FieldValue::Null;
                }

                match self.date_parser.parse(&source, reference) {
                    Some(at) => {
                        let has_time = has_time_component(&source);
                        let at = if has_time {
                            at
                        } else {
                            at.date().and_time(NaiveTime::MIN)
                        };
                        FieldValue::Date(DateValue::Resolved {
                            at,
                            has_time,
                            source,
                        })
                    }
                    None => {
                        note(
                            NoteKind::Unresolved,
                            format!("could not resolve \"{}\"; kept as written", source),
                        );
                        FieldValue::Date(DateValue::Unresolved { source })
                    }
                }
            }
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Exact member first, then a case-insensitive one. Nothing looser.
fn match_enum<'a>(text: &str, legal: &'a [String]) -> Option<&'a str> {
    let text = text.trim();
    legal
        .iter()
        .find(|m| m.as_str() == text)
        .or_else(|| legal.iter().find(|m| m.to_lowercase() == text.to_lowercase()))
        .map(String::as_str)
}

/// String form of a JSON value; the flag is set when it was not a string.
fn text_of(value: &Value) -> (String, bool) {
    match value {
        Value::String(s) => (s.trim().to_string(), false),
        Value::Null => (String::new(), false),
        Value::Number(n) => (n.to_string(), true),
        Value::Bool(b) => (b.to_string(), true),
        Value::Array(items) => (
            items
                .iter()
                .filter_map(scalar_text)
                .collect::<Vec<_>>()
                .join(", "),
            true,
        ),
        Value::Object(_) => (value.to_string(), true),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// List items of a JSON value; the flag is set when anything was coerced.
fn list_of(value: &Value) -> (Vec<String>, bool) {
    match value {
        Value::Array(items) => {
            let coerced = items.iter().any(|i| !i.is_string());
            (items.iter().filter_map(scalar_text).collect(), coerced)
        }
        Value::String(s) if s.trim().is_empty() => (Vec::new(), false),
        Value::String(s) => (
            s.split([',', ';']).map(str::to_string).collect(),
            true,
        ),
        other => (scalar_text(other).into_iter().collect(), true),
    }
}

/// Trim, strip the marker, drop blanks and case-insensitive duplicates.
/// First occurrence wins and order is preserved. Returns the kept entries
/// and the raw entries that were dropped.
fn clean_list(items: Vec<String>, marker: Option<&str>) -> (Vec<String>, Vec<String>) {
    let mut seen = HashSet::new();
    let mut kept = Vec::new();
    let mut dropped = Vec::new();
    for raw in items {
        let item = raw.trim();
        let item = match marker {
            Some(m) => item.strip_prefix(m).unwrap_or(item).trim(),
            None => item,
        };
        if !item.is_empty() && seen.insert(item.to_lowercase()) {
            kept.push(item.to_string());
        } else {
            dropped.push(raw);
        }
    }
    (kept, dropped)
}
