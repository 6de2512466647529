//! Deterministic template rendering
//!
//! Placeholders use `{{name}}` syntax. Names may be dotted (`{{hero.name}}`)
//! to reach into structured values. Substitution is a single pass: text
//! inserted for one placeholder is never scanned again.

use crate::error::RenderError;
use crate::text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]*)\}\}").expect("placeholder pattern is valid"));

static NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
        .expect("name pattern is valid")
});

/// Values available to a render
///
/// Backed by an ordered map, so two contexts holding the same entries are
/// indistinguishable no matter how they were built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    values: BTreeMap<String, Value>,
}

impl RenderContext {
    /// Create empty context
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// With a value (builder form)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Look up a placeholder name, walking dotted segments into objects
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value);
        }
        let mut segments = name.split('.');
        let mut current = self.values.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Names in the context
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RenderContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Self::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}

impl From<serde_json::Map<String, Value>> for RenderContext {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

/// Serialize a JSON value canonically
///
/// Object keys are sorted at every level and no whitespace is emitted, so the
/// same logical value always produces the same bytes.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, &Value> = map.iter().collect();
            out.push('{');
            for (i, (key, item)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_scalar(&Value::String(key.clone()), out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => write_scalar(scalar, out),
    }
}

fn write_scalar(value: &Value, out: &mut String) {
    // Display for scalar Values is compact serde_json output and cannot fail
    let _ = write!(out, "{value}");
}

/// Text inserted for a resolved value
///
/// Strings go in verbatim; everything else is canonical JSON.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => canonical_json(other),
    }
}

/// Placeholder names referenced by a template, sorted and deduplicated
///
/// # Errors
/// Returns error if a `{{...}}` token does not hold a valid name
pub fn placeholders(template: &str) -> Result<BTreeSet<String>, RenderError> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| parse_name(&caps[0], &caps[1]))
        .collect()
}

fn parse_name(raw: &str, inner: &str) -> Result<String, RenderError> {
    let name = inner.trim();
    if NAME.is_match(name) {
        Ok(name.to_string())
    } else {
        Err(RenderError::MalformedPlaceholder {
            raw: raw.to_string(),
        })
    }
}

/// Render a template against a context
///
/// Output is normalized to `\n` line endings without a BOM.
///
/// # Errors
/// - [`RenderError::UnresolvedPlaceholder`] if a name has no value
/// - [`RenderError::MalformedPlaceholder`] if a token is not a valid name
pub fn render(template: &str, values: &RenderContext) -> Result<String, RenderError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = parse_name(whole.as_str(), &caps[1])?;
        let value = values
            .resolve(&name)
            .ok_or_else(|| RenderError::UnresolvedPlaceholder { name: name.clone() })?;

        out.push_str(&template[last..whole.start()]);
        out.push_str(&value_text(value));
        last = whole.end();
    }
    out.push_str(&template[last..]);

    Ok(text::normalize(&out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renders_strings_verbatim() {
        let ctx = RenderContext::new().with("name", "Mira");
        assert_eq!(render("Hello {{name}}!", &ctx).unwrap(), "Hello Mira!");
    }

    #[test]
    fn tolerates_inner_whitespace() {
        let ctx = RenderContext::new().with("name", "Mira");
        assert_eq!(render("{{ name }}", &ctx).unwrap(), "Mira");
    }

    #[test]
    fn structured_values_are_canonical_json() {
        let ctx = RenderContext::new().with("state", json!({"b": 2, "a": [1, {"d": 4, "c": 3}]}));
        assert_eq!(
            render("{{state}}", &ctx).unwrap(),
            r#"{"a":[1,{"c":3,"d":4}],"b":2}"#
        );
    }

    #[test]
    fn numbers_and_bools() {
        let ctx = RenderContext::new().with("n", 3).with("f", 1.5).with("b", true);
        assert_eq!(render("{{n}} {{f}} {{b}}", &ctx).unwrap(), "3 1.5 true");
    }

    #[test]
    fn dotted_names_walk_objects() {
        let ctx = RenderContext::new().with("hero", json!({"name": "Ash", "hp": {"current": 7}}));
        assert_eq!(
            render("{{hero.name}}:{{hero.hp.current}}", &ctx).unwrap(),
            "Ash:7"
        );
    }

    #[test]
    fn unresolved_placeholder_is_error() {
        let ctx = RenderContext::new().with("a", "x");
        let err = render("{{a}} {{missing}}", &ctx).unwrap_err();
        assert!(matches!(
            err,
            RenderError::UnresolvedPlaceholder { ref name } if name == "missing"
        ));
    }

    #[test]
    fn malformed_placeholder_is_error() {
        let ctx = RenderContext::new();
        assert!(matches!(
            render("{{ not valid }}", &ctx),
            Err(RenderError::MalformedPlaceholder { .. })
        ));
    }

    #[test]
    fn inserted_text_is_not_rescanned() {
        let ctx = RenderContext::new().with("a", "{{b}}").with("b", "no");
        assert_eq!(render("{{a}}", &ctx).unwrap(), "{{b}}");
    }

    #[test]
    fn output_is_normalized() {
        let ctx = RenderContext::new().with("v", "x\r\ny");
        assert_eq!(render("\u{feff}{{v}}\r\n", &ctx).unwrap(), "x\ny\n");
    }

    #[test]
    fn placeholder_set_is_sorted() {
        let names = placeholders("{{b}} {{a}} {{ b }}").unwrap();
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let template = "{{x}}|{{y}}|{{z}}";
        let forward: RenderContext = vec![("x", json!(1)), ("y", json!({"k": 1, "a": 2})), ("z", json!("s"))]
            .into_iter()
            .collect();
        let backward: RenderContext = vec![("z", json!("s")), ("y", json!({"a": 2, "k": 1})), ("x", json!(1))]
            .into_iter()
            .collect();
        assert_eq!(render(template, &forward).unwrap(), render(template, &backward).unwrap());
    }
}
