//! Committed template checksums
//!
//! A [`ChecksumSet`] records the canonical digest of every compiled template.
//! Committing it next to the sources turns unintended template drift into a
//! build failure.

use crate::error::CompositionError;
use quire_hash::{fingerprint, ContentHash};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Template name → checksum of its compiled text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecksumSet {
    entries: BTreeMap<String, ContentHash>,
}

impl ChecksumSet {
    /// Create empty set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a checksum
    pub fn insert(&mut self, name: impl Into<String>, hash: ContentHash) {
        self.entries.insert(name.into(), hash);
    }

    /// Checksum for a template
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ContentHash> {
        self.entries.get(name)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentHash)> {
        self.entries.iter().map(|(n, h)| (n.as_str(), h))
    }

    /// Names whose checksum differs, or that exist on only one side
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|(name, hash)| other.entries.get(*name) != Some(*hash))
            .map(|(name, _)| name.clone())
            .collect();
        names.extend(
            other
                .entries
                .keys()
                .filter(|name| !self.entries.contains_key(*name))
                .cloned(),
        );
        names.sort();
        names
    }

    /// Single fingerprint over the whole set
    #[must_use]
    pub fn fingerprint(&self) -> String {
        fingerprint(self.iter())
    }

    /// Load a committed checksum file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CompositionError> {
        let path = path.as_ref();
        let text =
            std::fs::read_to_string(path).map_err(|e| CompositionError::io_error(path, e))?;
        serde_json::from_str(&text).map_err(|source| CompositionError::ChecksumFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the set as sorted, pretty JSON with a trailing newline
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CompositionError> {
        let path = path.as_ref();
        let mut text =
            serde_json::to_string_pretty(self).map_err(|source| CompositionError::ChecksumFile {
                path: path.to_path_buf(),
                source,
            })?;
        text.push('\n');
        std::fs::write(path, text).map_err(|e| CompositionError::io_error(path, e))
    }
}

impl FromIterator<(String, ContentHash)> for ChecksumSet {
    fn from_iter<I: IntoIterator<Item = (String, ContentHash)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(pairs: &[(&str, &str)]) -> ChecksumSet {
        pairs
            .iter()
            .map(|(n, t)| ((*n).to_string(), ContentHash::of_text(t)))
            .collect()
    }

    #[test]
    fn diff_reports_changed_added_removed() {
        let a = set(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let b = set(&[("a", "1"), ("b", "changed"), ("d", "4")]);
        assert_eq!(a.diff(&b), vec!["b", "c", "d"]);
        assert!(a.diff(&a).is_empty());
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checksums.json");
        let original = set(&[("x", "one"), ("y", "two")]);
        original.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        assert!(!text.contains('\r'));

        assert_eq!(ChecksumSet::load(&path).unwrap(), original);
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checksums.json");
        std::fs::write(&path, "{\"x\": \"not-hex\"}").unwrap();
        assert!(matches!(
            ChecksumSet::load(&path),
            Err(CompositionError::ChecksumFile { .. })
        ));
    }

    #[test]
    fn fingerprint_tracks_content() {
        let a = set(&[("x", "one")]);
        let b = set(&[("x", "two")]);
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
