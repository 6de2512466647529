//! Quire Hashing
//!
//! Stable content hashing for prompt fragments and compiled templates.
//!
//! # Core Concepts
//!
//! - [`ContentHash`]: 32-byte SHA-256 digest, hex in every serialized form
//! - [`hash_text`]: digest of a text value as lowercase hex
//! - [`hash_prompt_parts`]: independent digests of the three prompt regions
//!
//! # Example
//!
//! ```rust
//! use quire_hash::{hash_prompt_parts, hash_text, PromptRegion};
//!
//! assert_eq!(hash_text("abc"), hash_text("abc"));
//!
//! let first = hash_prompt_parts("SYSTEM", "scene 1", "SYSTEM\nscene 1");
//! let second = hash_prompt_parts("SYSTEM", "scene 2", "SYSTEM\nscene 2");
//! assert!(!first.changed_regions(&second).contains(&PromptRegion::StablePrefix));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
mod hash;
mod prompt;

// Re-exports
pub use hash::{fingerprint, ContentHash, HashError};
pub use prompt::{hash_prompt_parts, hash_text, PromptHashes, PromptRegion};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn hash_text_is_a_pure_function(text in ".*") {
            prop_assert_eq!(hash_text(&text), hash_text(&text));
        }

        #[test]
        fn distinct_regions_never_collide(
            prefix in "[a-z]{1,12}",
            payload in "[A-Z]{1,12}",
        ) {
            let assembled = format!("{prefix}\n{payload}");
            let hashes = hash_prompt_parts(&prefix, &payload, &assembled);
            prop_assert!(!hashes.has_duplicate_regions());
        }
    }
}
