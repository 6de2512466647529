//! Per-region prompt digests
//!
//! A prompt is assembled from a stable prefix (system text that should rarely
//! change) and a dynamic payload (scene-specific state). Hashing each region
//! independently lets callers see which one moved between two runs.

use crate::hash::ContentHash;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Hash a text value to a lowercase hex SHA-256 digest
#[inline]
#[must_use]
pub fn hash_text(text: &str) -> String {
    ContentHash::of_text(text).to_string()
}

/// Semantically distinct region of an assembled prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptRegion {
    /// Template text shared by every scene of a step
    StablePrefix,
    /// Scene-specific rendered values
    DynamicPayload,
    /// Full text sent to the provider
    AssembledPrompt,
}

impl PromptRegion {
    /// All regions in canonical order
    pub const ALL: [PromptRegion; 3] = [
        PromptRegion::StablePrefix,
        PromptRegion::DynamicPayload,
        PromptRegion::AssembledPrompt,
    ];

    /// Stable identifier used in logs and serialized records
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StablePrefix => "stable_prefix",
            Self::DynamicPayload => "dynamic_payload",
            Self::AssembledPrompt => "assembled_prompt",
        }
    }
}

impl Display for PromptRegion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Independent digests of the three prompt regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PromptHashes {
    /// Digest of the stable prefix
    pub stable_prefix: ContentHash,
    /// Digest of the dynamic payload
    pub dynamic_payload: ContentHash,
    /// Digest of the assembled prompt
    pub assembled_prompt: ContentHash,
}

impl PromptHashes {
    /// Digest for a single region
    #[inline]
    #[must_use]
    pub fn get(&self, region: PromptRegion) -> &ContentHash {
        match region {
            PromptRegion::StablePrefix => &self.stable_prefix,
            PromptRegion::DynamicPayload => &self.dynamic_payload,
            PromptRegion::AssembledPrompt => &self.assembled_prompt,
        }
    }

    /// Regions whose digest differs from `other`
    #[must_use]
    pub fn changed_regions(&self, other: &Self) -> Vec<PromptRegion> {
        PromptRegion::ALL
            .into_iter()
            .filter(|region| self.get(*region) != other.get(*region))
            .collect()
    }

    /// True when two regions carry the same digest
    ///
    /// Distinct sources always hash apart, so a collision here means one
    /// region was accidentally built from another (for example the payload
    /// being set to the whole assembled prompt).
    #[must_use]
    pub fn has_duplicate_regions(&self) -> bool {
        self.stable_prefix == self.dynamic_payload
            || self.stable_prefix == self.assembled_prompt
            || self.dynamic_payload == self.assembled_prompt
    }
}

/// Hash the three prompt regions independently
#[must_use]
pub fn hash_prompt_parts(
    stable_prefix: &str,
    dynamic_payload: &str,
    assembled_prompt: &str,
) -> PromptHashes {
    PromptHashes {
        stable_prefix: ContentHash::of_text(stable_prefix),
        dynamic_payload: ContentHash::of_text(dynamic_payload),
        assembled_prompt: ContentHash::of_text(assembled_prompt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_text_is_stable() {
        assert_eq!(hash_text("abc"), hash_text("abc"));
        assert_ne!(hash_text("abc"), hash_text("abd"));
        assert_eq!(hash_text("abc").len(), 64);
    }

    #[test]
    fn distinct_parts_hash_pairwise_distinct() {
        let hashes = hash_prompt_parts("SYSTEM", "payload", "SYSTEM\npayload");
        assert_ne!(hashes.stable_prefix, hashes.dynamic_payload);
        assert_ne!(hashes.stable_prefix, hashes.assembled_prompt);
        assert_ne!(hashes.dynamic_payload, hashes.assembled_prompt);
        assert!(!hashes.has_duplicate_regions());
    }

    #[test]
    fn duplicated_region_is_detected() {
        let hashes = hash_prompt_parts("SYSTEM", "SYSTEM\npayload", "SYSTEM\npayload");
        assert!(hashes.has_duplicate_regions());
    }

    #[test]
    fn changed_regions_reports_only_moved_parts() {
        let before = hash_prompt_parts("SYSTEM", "scene 1", "SYSTEM\nscene 1");
        let after = hash_prompt_parts("SYSTEM", "scene 2", "SYSTEM\nscene 2");
        assert_eq!(
            before.changed_regions(&after),
            vec![PromptRegion::DynamicPayload, PromptRegion::AssembledPrompt]
        );
        assert!(before.changed_regions(&before).is_empty());
    }

    #[test]
    fn region_names() {
        assert_eq!(PromptRegion::StablePrefix.to_string(), "stable_prefix");
        assert_eq!(PromptRegion::AssembledPrompt.as_str(), "assembled_prompt");
    }
}
