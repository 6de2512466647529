//! Raw model response parsing
//!
//! Scene responses carry two marked sections:
//!
//! ````text
//! PROSE:
//! Mara crossed the gate...
//!
//! STATE_PATCH:
//! ```json
//! {"delta": {"stamina": -5}}
//! ```
//! ````
//!
//! Older prompts emit `STATE_OKPATCH:` instead of `STATE_PATCH:`; both are
//! accepted.

use crate::error::{ParseError, PatchError};
use crate::patch::StatePatch;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static PROSE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*PROSE[ \t]*:").expect("prose pattern is valid"));

static PATCH_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:STATE_PATCH|STATE_OKPATCH)[ \t]*:").expect("patch pattern is valid")
});

/// Prose and raw patch document extracted from a response
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    /// Scene prose, trimmed, LF line endings; empty if no `PROSE:` marker
    pub prose: String,

    /// Patch document, always a JSON object
    pub patch: Value,
}

impl ParsedResponse {
    /// Normalize the patch document into typed operations
    ///
    /// # Errors
    /// Returns error if the document is not a valid `{set, delta}` patch
    pub fn state_patch(&self) -> Result<StatePatch, PatchError> {
        StatePatch::from_value(&self.patch)
    }
}

/// Split a raw response into prose and patch
///
/// A leading byte-order mark is dropped and line endings become LF before
/// the markers are located.
///
/// # Errors
/// - [`ParseError::MissingPatch`] if there is no patch marker or no JSON after it
/// - [`ParseError::InvalidJson`] if the patch JSON is malformed
/// - [`ParseError::PatchNotObject`] if the patch JSON is not an object
pub fn parse_response(raw: &str) -> Result<ParsedResponse, ParseError> {
    let raw = raw
        .trim_start_matches('\u{feff}')
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let patch_marker = PATCH_MARKER.find(&raw).ok_or(ParseError::MissingPatch)?;

    let prose = match PROSE_MARKER.find(&raw) {
        Some(m) if m.end() <= patch_marker.start() => &raw[m.end()..patch_marker.start()],
        Some(m) => &raw[m.end()..],
        None => "",
    };
    let prose = strip_fence(prose.trim()).trim().to_string();

    let body = strip_fence(raw[patch_marker.end()..].trim());
    let mut values = serde_json::Deserializer::from_str(body).into_iter::<Value>();
    let patch = match values.next() {
        None => return Err(ParseError::MissingPatch),
        Some(value) => value?,
    };
    if !patch.is_object() {
        return Err(ParseError::PatchNotObject);
    }

    Ok(ParsedResponse { prose, patch })
}

/// Remove a surrounding code fence, with or without a language tag
fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let inner = rest.split_once('\n').map_or("", |(_, body)| body);
    match inner.find("```") {
        Some(end) => inner[..end].trim(),
        None => inner.trim(),
    }
}
