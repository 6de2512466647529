//! State patches
//!
//! A model proposes changes as a loosely-typed document:
//!
//! ```json
//! { "set": { "hp.max": 12 }, "delta": { "stamina": -5, "hp": { "current": 2 } } }
//! ```
//!
//! [`StatePatch::from_value`] validates that document once at ingress and
//! normalizes it into a flat list of [`PatchOp`]s over [`StatePath`]s. The
//! precedence rule is resolved here: a delta whose path overlaps any `set`
//! path is dropped, so the merge engine never sees both for one path.

use crate::error::PatchError;
use crate::path::StatePath;
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Single normalized patch operation
#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    /// Replace the value at the path wholesale
    Set { path: StatePath, value: Value },

    /// Add to the numeric value at the path (created if absent)
    Delta { path: StatePath, amount: Number },
}

impl PatchOp {
    /// Target path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &StatePath {
        match self {
            Self::Set { path, .. } | Self::Delta { path, .. } => path,
        }
    }

    /// Check if operation depends on the existing value
    #[inline]
    #[must_use]
    pub fn reads_state(&self) -> bool {
        matches!(self, Self::Delta { .. })
    }

    /// Check if this delta is a no-op amount
    #[must_use]
    pub fn is_zero_delta(&self) -> bool {
        match self {
            Self::Delta { amount, .. } => amount.as_f64() == Some(0.0),
            Self::Set { .. } => false,
        }
    }
}

/// Validated, normalized state patch
///
/// # Invariants
/// - No delta path overlaps a set path
/// - Sets are ordered by path, so a parent set lands before a child set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    ops: Vec<PatchOp>,
    shadowed: Vec<StatePath>,
}

impl StatePatch {
    /// Create empty patch
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize a raw patch document
    ///
    /// # Errors
    /// Returns error if the document is not `{set?: {...}, delta?: {...}}`,
    /// a key is not a valid path, or a delta leaf is not numeric
    pub fn from_value(value: &Value) -> Result<Self, PatchError> {
        let doc = value.as_object().ok_or(PatchError::NotAnObject)?;
        if let Some(key) = doc.keys().find(|k| *k != "set" && *k != "delta") {
            return Err(PatchError::UnexpectedField(key.clone()));
        }

        let sets = match doc.get("set") {
            Some(section) => collect_sets(section)?,
            None => BTreeMap::new(),
        };
        let mut deltas = BTreeMap::new();
        if let Some(section) = doc.get("delta") {
            let map = section
                .as_object()
                .ok_or(PatchError::SectionNotObject("delta"))?;
            flatten_deltas(None, map, &mut deltas)?;
        }

        Ok(Self::from_parts(sets, deltas))
    }

    /// Build from already-typed parts
    #[must_use]
    pub fn from_parts(
        sets: BTreeMap<StatePath, Value>,
        deltas: BTreeMap<StatePath, Number>,
    ) -> Self {
        let mut ops = Vec::with_capacity(sets.len() + deltas.len());
        let mut shadowed = Vec::new();

        for (path, amount) in deltas {
            if sets.keys().any(|s| s.overlaps(&path)) {
                shadowed.push(path);
            } else {
                ops.push(PatchOp::Delta { path, amount });
            }
        }
        for (path, value) in sets {
            ops.push(PatchOp::Set { path, value });
        }

        Self { ops, shadowed }
    }

    /// Normalized operations
    #[inline]
    #[must_use]
    pub fn ops(&self) -> &[PatchOp] {
        &self.ops
    }

    /// Delta paths dropped because a set covers them
    #[inline]
    #[must_use]
    pub fn shadowed_deltas(&self) -> &[StatePath] {
        &self.shadowed
    }

    /// Number of operations
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if patch does nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Render back to the `{set, delta}` document form
    ///
    /// Shadowed deltas are not included.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut set = Map::new();
        let mut delta = Map::new();
        for op in &self.ops {
            match op {
                PatchOp::Set { path, value } => {
                    set.insert(path.to_string(), value.clone());
                }
                PatchOp::Delta { path, amount } => {
                    delta.insert(path.to_string(), Value::Number(amount.clone()));
                }
            }
        }
        let mut doc = Map::new();
        doc.insert("set".to_string(), Value::Object(set));
        doc.insert("delta".to_string(), Value::Object(delta));
        Value::Object(doc)
    }
}

fn parse_key(key: &str) -> Result<StatePath, PatchError> {
    key.parse().map_err(|source| PatchError::InvalidPath {
        key: key.to_string(),
        source,
    })
}

fn collect_sets(section: &Value) -> Result<BTreeMap<StatePath, Value>, PatchError> {
    let map = section.as_object().ok_or(PatchError::SectionNotObject("set"))?;
    map.iter()
        .map(|(key, value)| Ok((parse_key(key)?, value.clone())))
        .collect()
}

fn flatten_deltas(
    prefix: Option<&StatePath>,
    map: &Map<String, Value>,
    out: &mut BTreeMap<StatePath, Number>,
) -> Result<(), PatchError> {
    for (key, value) in map {
        let relative = parse_key(key)?;
        let path = match prefix {
            Some(p) => {
                let mut joined = p.clone();
                for seg in relative.segments() {
                    joined = joined.child(seg.clone()).map_err(|source| {
                        PatchError::InvalidPath {
                            key: key.clone(),
                            source,
                        }
                    })?;
                }
                joined
            }
            None => relative,
        };
        match value {
            Value::Number(n) => {
                if out.contains_key(&path) {
                    return Err(PatchError::DuplicateDelta {
                        path: path.to_string(),
                    });
                }
                out.insert(path, n.clone());
            }
            Value::Object(inner) => flatten_deltas(Some(&path), inner, out)?,
            _ => {
                return Err(PatchError::NonNumericDelta {
                    path: path.to_string(),
                })
            }
        }
    }
    Ok(())
}

/// Builder for constructing patches in code
#[derive(Debug, Default)]
pub struct PatchBuilder {
    sets: BTreeMap<StatePath, Value>,
    deltas: BTreeMap<StatePath, Number>,
}

impl PatchBuilder {
    /// Create new builder
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a set operation
    #[must_use]
    pub fn set(mut self, path: StatePath, value: impl Into<Value>) -> Self {
        self.sets.insert(path, value.into());
        self
    }

    /// Add a delta operation
    #[must_use]
    pub fn delta(mut self, path: StatePath, amount: impl Into<Number>) -> Self {
        self.deltas.insert(path, amount.into());
        self
    }

    /// Build patch
    #[must_use]
    pub fn build(self) -> StatePatch {
        StatePatch::from_parts(self.sets, self.deltas)
    }
}
