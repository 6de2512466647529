//! Quire Narrative State
//!
//! The running narrative state and the only sanctioned way to change it.
//!
//! # Core Concepts
//!
//! - [`StateBag`]: numeric and nested-object state, addressed by [`StatePath`]
//! - [`StatePatch`]: `set`/`delta` changes, validated once and normalized to [`PatchOp`]s
//! - [`apply`]: set wins over delta, deltas add, missing paths are created
//! - [`StateCommit`]: stage, validate, then swap in (all-or-nothing)
//! - [`ContinuityPack`]: end-of-scene summary with every field required
//! - [`SchemaValidator`]: validation contract for model-produced JSON
//! - [`parse_response`]: split a raw model response into prose and patch
//!
//! # Example
//!
//! ```rust,ignore
//! use quire_state::{apply, parse_response, StateBag};
//!
//! let parsed = parse_response(raw)?;
//! let patch = parsed.state_patch()?;
//! apply(&mut bag, &patch)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
mod bag;
mod continuity;
mod error;
mod merge;
mod patch;
mod path;
mod response;
pub mod schema;

// Re-exports
pub use bag::StateBag;
pub use continuity::ContinuityPack;
pub use error::{ContinuityError, MergeError, ParseError, PatchError, SchemaError};
pub use merge::{apply, StateCommit};
pub use patch::{PatchBuilder, PatchOp, StatePatch};
pub use path::{PathError, StatePath};
pub use response::{parse_response, ParsedResponse};
pub use schema::{JsonSchemaValidator, SchemaValidator};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};

    proptest! {
        #[test]
        fn zero_delta_never_changes_a_bag(
            stats in proptest::collection::btree_map("[a-z]{1,8}", -1000i64..1000, 0..8),
        ) {
            let root: Map<String, Value> = stats
                .iter()
                .map(|(k, v)| (k.clone(), json!(v)))
                .collect();
            let zeros: Map<String, Value> = stats.keys().map(|k| (k.clone(), json!(0))).collect();
            let mut bag = StateBag::from_value(Value::Object(root)).unwrap();
            let before = bag.clone();
            let patch = StatePatch::from_value(&json!({"delta": zeros})).unwrap();
            apply(&mut bag, &patch).unwrap();
            prop_assert_eq!(bag, before);
        }

        #[test]
        fn set_always_wins(start in -1000i64..1000, set in -1000i64..1000, delta in -1000i64..1000) {
            let mut bag = StateBag::from_value(json!({"stamina": start})).unwrap();
            let patch = StatePatch::from_value(&json!({
                "set": {"stamina": set},
                "delta": {"stamina": delta}
            }))
            .unwrap();
            apply(&mut bag, &patch).unwrap();
            prop_assert_eq!(bag.get_str("stamina"), Some(&json!(set)));
        }
    }
}
