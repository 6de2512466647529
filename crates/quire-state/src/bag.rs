//! Narrative state bag
//!
//! Provides [`StateBag`], the mutable numeric/structured state of a character
//! or world. Only the merge engine mutates it; everything else reads.

use crate::path::StatePath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mapping from keys to numeric or nested-object values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateBag {
    root: Map<String, Value>,
}

impl StateBag {
    /// Create empty bag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create bag from a JSON object
    ///
    /// Returns `None` if the value is not an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(root) => Some(Self { root }),
            _ => None,
        }
    }

    /// Value at a path
    #[must_use]
    pub fn get(&self, path: &StatePath) -> Option<&Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.root.get(first)?;
        for segment in rest {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Numeric value at a path as `f64`
    #[must_use]
    pub fn number(&self, path: &StatePath) -> Option<f64> {
        self.get(path).and_then(Value::as_f64)
    }

    /// Parse a dotted path and read its value
    #[must_use]
    pub fn get_str(&self, path: &str) -> Option<&Value> {
        path.parse().ok().and_then(|p| self.get(&p))
    }

    /// Top-level keys, sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root.keys().map(String::as_str)
    }

    /// Number of top-level keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Borrow as a JSON object
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Snapshot as a JSON value
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub(crate) fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }
}
