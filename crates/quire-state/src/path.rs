//! State paths for addressing inside a state bag
//!
//! Provides [`StatePath`] for hierarchical addressing of values such as
//! `stamina` or `hp.current`.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Dotted path into a state bag
///
/// # Examples
/// - `["stamina"]` → `stamina`
/// - `["hp", "current"]` → `hp.current`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StatePath(Vec<String>);

impl StatePath {
    /// Create path from a single segment
    ///
    /// # Errors
    /// Returns error if the segment is not a valid key
    pub fn single(segment: impl Into<String>) -> Result<Self, PathError> {
        let segment = segment.into();
        validate_segment(&segment)?;
        Ok(Self(vec![segment]))
    }

    /// Path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Paths are never empty once parsed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment
    #[inline]
    #[must_use]
    pub fn leaf(&self) -> &str {
        self.0.last().map_or("", String::as_str)
    }

    /// Append a segment, returning new path
    ///
    /// # Errors
    /// Returns error if the segment is not a valid key
    pub fn child(&self, segment: impl Into<String>) -> Result<Self, PathError> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut new = self.clone();
        new.0.push(segment);
        Ok(new)
    }

    /// Check if this path is a prefix of another
    ///
    /// # Examples
    /// - `hp` is prefix of `hp.current`
    /// - `hp` is NOT prefix of `hpx`
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Check if paths overlap (one is prefix of other)
    #[inline]
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

/// Segments are free-form keys (`healing potion` is fine) but may not be
/// empty, padded with whitespace, or contain `.` or control characters
fn validate_segment(seg: &str) -> Result<(), PathError> {
    if seg.is_empty() {
        Err(PathError::EmptySegment)
    } else if seg.trim() != seg || seg.contains(|c: char| c == '.' || c.is_control()) {
        Err(PathError::InvalidSegment(seg.to_string()))
    } else {
        Ok(())
    }
}

impl Display for StatePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

impl FromStr for StatePath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        let segments = s
            .split('.')
            .map(|seg| validate_segment(seg).map(|()| seg.to_string()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(segments))
    }
}

/// Errors when parsing state paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Whole path is empty
    #[error("empty state path")]
    Empty,

    /// Empty segment (`a..b`)
    #[error("empty path segment")]
    EmptySegment,

    /// Segment with a `.`, a control character, or surrounding whitespace
    #[error("invalid path segment: '{0}'")]
    InvalidSegment(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_dotted() {
        let path: StatePath = "hp.current".parse().unwrap();
        assert_eq!(path.segments(), &["hp".to_string(), "current".to_string()]);
        assert_eq!(path.leaf(), "current");
        assert_eq!(path.to_string(), "hp.current");
    }

    #[test]
    fn parse_rejects_bad_paths() {
        assert_eq!("".parse::<StatePath>(), Err(PathError::Empty));
        assert_eq!("a..b".parse::<StatePath>(), Err(PathError::EmptySegment));
        assert!(matches!(
            "a. b".parse::<StatePath>(),
            Err(PathError::InvalidSegment(_))
        ));
        assert!(StatePath::single("a.b").is_err());
        assert!(StatePath::single("tab\there").is_err());
    }

    #[test]
    fn natural_keys_are_segments() {
        let path: StatePath = "inventory.healing potion".parse().unwrap();
        assert_eq!(path.leaf(), "healing potion");
        assert_eq!(path.to_string(), "inventory.healing potion");
    }

    #[test]
    fn prefix_and_overlap() {
        let hp: StatePath = "hp".parse().unwrap();
        let current: StatePath = "hp.current".parse().unwrap();
        let hpx: StatePath = "hpx".parse().unwrap();
        assert!(hp.is_prefix_of(&current));
        assert!(!current.is_prefix_of(&hp));
        assert!(hp.overlaps(&current) && current.overlaps(&hp));
        assert!(!hp.overlaps(&hpx));
    }

    #[test]
    fn child_extends() {
        let hp = StatePath::single("hp").unwrap();
        assert_eq!(hp.child("max").unwrap().to_string(), "hp.max");
        assert!(hp.child("").is_err());
    }
}
