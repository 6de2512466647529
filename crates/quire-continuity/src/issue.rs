//! Continuity issues
//!
//! Provides [`Issue`], the advisory finding every rule reports, and the
//! closed set of [`IssueCode`]s.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Kind of continuity problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// Prose or proposed state negates a declared fact
    Contradiction,

    /// A completed milestone is enacted again
    MilestoneDuplicate,

    /// A pending milestone is narrated as completed
    MilestoneFuture,

    /// First-person narration in a third-person scene
    PovDrift,
}

impl IssueCode {
    /// All codes
    pub const ALL: [Self; 4] = [
        Self::Contradiction,
        Self::MilestoneDuplicate,
        Self::MilestoneFuture,
        Self::PovDrift,
    ];

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contradiction => "contradiction",
            Self::MilestoneDuplicate => "milestone_duplicate",
            Self::MilestoneFuture => "milestone_future",
            Self::PovDrift => "pov_drift",
        }
    }
}

impl Display for IssueCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single advisory finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// What kind of problem
    pub code: IssueCode,

    /// Invariant text the finding is about (empty for POV drift)
    pub invariant: String,

    /// Human-readable explanation
    pub detail: String,

    /// Offending sentence
    pub excerpt: String,
}

impl Issue {
    /// Create issue
    #[must_use]
    pub fn new(
        code: IssueCode,
        invariant: impl Into<String>,
        detail: impl Into<String>,
        excerpt: impl Into<String>,
    ) -> Self {
        Self {
            code,
            invariant: invariant.into(),
            detail: detail.into(),
            excerpt: excerpt.into(),
        }
    }
}

impl Display for Issue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.detail)?;
        if !self.excerpt.is_empty() {
            write!(f, " (\"{}\")", self.excerpt)?;
        }
        Ok(())
    }
}
