//! Continuity packs
//!
//! A [`ContinuityPack`] is the structured end-of-scene summary handed to the
//! next scene. Every field is required; reading one from raw JSON reports the
//! first missing or mistyped field by name.

use crate::error::ContinuityError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Write as _;

/// End-of-scene continuity summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuityPack {
    /// Closing beat the next scene picks up from
    pub scene_end_anchor: String,

    /// Hard constraints that must keep holding
    pub constraints: Vec<String>,

    /// Plot thread ids still open
    pub open_threads: Vec<String>,

    /// Character ids on stage at scene end
    pub cast_present: Vec<String>,

    /// Location id
    pub location: String,

    /// What happens next
    pub next_action: String,
}

impl ContinuityPack {
    /// Required field names in document order
    pub const FIELDS: [&'static str; 6] = [
        "scene_end_anchor",
        "constraints",
        "open_threads",
        "cast_present",
        "location",
        "next_action",
    ];

    /// Read a pack from raw JSON
    ///
    /// Unknown extra fields are ignored.
    ///
    /// # Errors
    /// Returns error naming the first field (in [`Self::FIELDS`] order) that
    /// is missing or has the wrong type
    pub fn from_value(value: &Value) -> Result<Self, ContinuityError> {
        let doc = value.as_object().ok_or(ContinuityError::NotAnObject)?;
        Ok(Self {
            scene_end_anchor: string_field(doc, "scene_end_anchor")?,
            constraints: list_field(doc, "constraints")?,
            open_threads: list_field(doc, "open_threads")?,
            cast_present: list_field(doc, "cast_present")?,
            location: string_field(doc, "location")?,
            next_action: string_field(doc, "next_action")?,
        })
    }

    /// Serialize to JSON
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(
            "scene_end_anchor".to_string(),
            Value::String(self.scene_end_anchor.clone()),
        );
        doc.insert("constraints".to_string(), string_list(&self.constraints));
        doc.insert("open_threads".to_string(), string_list(&self.open_threads));
        doc.insert("cast_present".to_string(), string_list(&self.cast_present));
        doc.insert("location".to_string(), Value::String(self.location.clone()));
        doc.insert(
            "next_action".to_string(),
            Value::String(self.next_action.clone()),
        );
        Value::Object(doc)
    }

    /// Render as a prompt-ready block
    #[must_use]
    pub fn to_prompt_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Scene end: {}", self.scene_end_anchor);
        let _ = writeln!(out, "Location: {}", self.location);
        let _ = writeln!(out, "Cast present: {}", join_or_none(&self.cast_present));
        let _ = writeln!(out, "Open threads: {}", join_or_none(&self.open_threads));
        out.push_str("Constraints:\n");
        if self.constraints.is_empty() {
            out.push_str("- (none)\n");
        }
        for constraint in &self.constraints {
            let _ = writeln!(out, "- {constraint}");
        }
        let _ = writeln!(out, "Next action: {}", self.next_action);
        out
    }
}

fn string_field(doc: &Map<String, Value>, field: &'static str) -> Result<String, ContinuityError> {
    match doc.get(field) {
        None => Err(ContinuityError::MissingField { field }),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ContinuityError::WrongType {
            field,
            expected: "a string",
        }),
    }
}

fn list_field(
    doc: &Map<String, Value>,
    field: &'static str,
) -> Result<Vec<String>, ContinuityError> {
    let wrong = ContinuityError::WrongType {
        field,
        expected: "an array of strings",
    };
    match doc.get(field) {
        None => Err(ContinuityError::MissingField { field }),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string).ok_or_else(|| wrong.clone()))
            .collect(),
        Some(_) => Err(wrong),
    }
}

fn string_list(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
