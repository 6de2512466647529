//! Merge engine
//!
//! Applies a [`StatePatch`] onto a [`StateBag`]. Merges are atomic: the ops
//! run against a private copy which replaces the bag only when every op
//! succeeded.

use crate::bag::StateBag;
use crate::error::MergeError;
use crate::patch::{PatchOp, StatePatch};
use crate::path::StatePath;
use serde_json::{Map, Number, Value};

/// Apply a patch to a bag in place
///
/// - `Set` replaces the value wholesale, creating missing parents
/// - `Delta` adds to the existing number, or creates it from the amount
///
/// Integral sums stay integral; anything else becomes a float.
///
/// # Errors
/// Returns error (leaving `bag` untouched) if a delta targets a non-number or
/// a path walks through a non-object
pub fn apply(bag: &mut StateBag, patch: &StatePatch) -> Result<(), MergeError> {
    let mut next = bag.clone();
    apply_ops(&mut next, patch.ops())?;
    *bag = next;
    Ok(())
}

fn apply_ops(bag: &mut StateBag, ops: &[PatchOp]) -> Result<(), MergeError> {
    for op in ops {
        match op {
            PatchOp::Set { path, value } => {
                let (parent, leaf) = parent_of(bag.root_mut(), path)?;
                parent.insert(leaf.to_string(), value.clone());
            }
            PatchOp::Delta { path, amount } => {
                let (parent, leaf) = parent_of(bag.root_mut(), path)?;
                let next = match parent.get(leaf) {
                    None => Number::clone(amount),
                    Some(Value::Number(current)) => add(current, amount).ok_or_else(|| {
                        MergeError::NonFinite {
                            path: path.to_string(),
                        }
                    })?,
                    Some(_) => {
                        return Err(MergeError::NotNumeric {
                            path: path.to_string(),
                        })
                    }
                };
                parent.insert(leaf.to_string(), Value::Number(next));
            }
        }
    }
    Ok(())
}

/// Walk to the object holding the path's leaf, creating missing objects
fn parent_of<'a, 'p>(
    root: &'a mut Map<String, Value>,
    path: &'p StatePath,
) -> Result<(&'a mut Map<String, Value>, &'p str), MergeError> {
    let segments = path.segments();
    let Some((leaf, parents)) = segments.split_last() else {
        return Err(MergeError::NotAnObject {
            path: String::new(),
        });
    };

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        current = match entry {
            Value::Object(map) => map,
            _ => {
                return Err(MergeError::NotAnObject {
                    path: segments[..=depth].join("."),
                })
            }
        };
    }
    Ok((current, leaf.as_str()))
}

fn add(a: &Number, b: &Number) -> Option<Number> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(sum) = x.checked_add(y) {
            return Some(Number::from(sum));
        }
    }
    let sum = a.as_f64()? + b.as_f64()?;
    // Whole results from whole operands beyond i64 range stay as floats
    Number::from_f64(sum)
}

/// Staged, all-or-nothing commit of a patch
///
/// The patch is applied to a private copy; the canonical bag is only replaced
/// once the caller's validation accepts the staged result.
///
/// ```rust,ignore
/// let mut commit = StateCommit::stage(&bag, &patch)?;
/// commit.validate(|staged| check_invariants(staged))?;
/// commit.commit_into(&mut bag);
/// ```
#[derive(Debug, Clone)]
pub struct StateCommit {
    staged: StateBag,
    validated: bool,
}

impl StateCommit {
    /// Apply a patch to a copy of the bag
    ///
    /// # Errors
    /// Returns merge errors; the original bag is never touched
    pub fn stage(bag: &StateBag, patch: &StatePatch) -> Result<Self, MergeError> {
        let mut staged = bag.clone();
        apply_ops(&mut staged, patch.ops())?;
        Ok(Self {
            staged,
            validated: false,
        })
    }

    /// The staged result
    #[inline]
    #[must_use]
    pub fn staged(&self) -> &StateBag {
        &self.staged
    }

    /// Run validation against the staged result
    ///
    /// # Errors
    /// Propagates the validator's error; the commit stays unvalidated
    pub fn validate<F, E>(&mut self, validator: F) -> Result<(), E>
    where
        F: FnOnce(&StateBag) -> Result<(), E>,
    {
        validator(&self.staged)?;
        self.validated = true;
        Ok(())
    }

    /// Check if validation has passed
    #[inline]
    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.validated
    }

    /// Swap the staged result into the canonical bag
    ///
    /// Returns `false` (and leaves `target` untouched) if validation has not
    /// passed.
    pub fn commit_into(self, target: &mut StateBag) -> bool {
        if !self.validated {
            tracing::warn!("refusing to commit unvalidated state");
            return false;
        }
        *target = self.staged;
        true
    }
}
