//! Declared invariants
//!
//! Invariants are free text. Two shapes are recognized and checked:
//!
//! - milestones: `milestone: shard_bind = DONE` / `milestone: maps_acquired = NOT_YET`
//! - standing facts: `the shard is physical`, `Tomas is alive`
//!
//! Anything else is kept as an opaque [`InvariantKind::Other`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

static MILESTONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*milestone\s*:\s*([a-z0-9][a-z0-9_-]*)\s*=\s*(done|not_yet)\s*\.?\s*$")
        .expect("milestone pattern is valid")
});

static FACT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(.+?)\s+(?:is|are|remains|remain|stays|stay)\s+(?:still\s+)?(present|physical|intact|alive)\s*\.?\s*$")
        .expect("fact pattern is valid")
});

/// Completion status of a milestone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneStatus {
    /// Already happened
    Done,

    /// Must not have happened yet
    NotYet,
}

impl Display for MilestoneStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Done => "DONE",
            Self::NotYet => "NOT_YET",
        })
    }
}

/// Standing condition asserted about a subject
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// On the scene
    Present,

    /// Has a body
    Physical,

    /// Unbroken
    Intact,

    /// Living
    Alive,
}

impl Condition {
    fn parse(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "present" => Some(Self::Present),
            "physical" => Some(Self::Physical),
            "intact" => Some(Self::Intact),
            "alive" => Some(Self::Alive),
            _ => None,
        }
    }

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Physical => "physical",
            Self::Intact => "intact",
            Self::Alive => "alive",
        }
    }
}

/// Recognized shape of an invariant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// `milestone: <id> = DONE|NOT_YET`
    Milestone {
        /// Milestone id, e.g. `shard_bind`
        id: String,
        /// Declared status
        status: MilestoneStatus,
    },

    /// `<subject> is <condition>`
    Fact {
        /// Subject as written, without a leading article
        subject: String,
        /// Asserted condition
        condition: Condition,
    },

    /// Unrecognized free text
    Other,
}

/// Declared invariant with its parsed shape
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Invariant {
    text: String,
    kind: InvariantKind,
}

impl Invariant {
    /// Parse free text
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let kind = if let Some(caps) = MILESTONE.captures(text) {
            let status = if caps[2].eq_ignore_ascii_case("done") {
                MilestoneStatus::Done
            } else {
                MilestoneStatus::NotYet
            };
            InvariantKind::Milestone {
                id: caps[1].to_ascii_lowercase(),
                status,
            }
        } else if let Some(caps) = FACT.captures(text) {
            match Condition::parse(&caps[2]) {
                Some(condition) => InvariantKind::Fact {
                    subject: strip_article(&caps[1]).to_string(),
                    condition,
                },
                None => InvariantKind::Other,
            }
        } else {
            InvariantKind::Other
        };

        Self {
            text: text.trim().to_string(),
            kind,
        }
    }

    /// Original text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parsed shape
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &InvariantKind {
        &self.kind
    }

    /// Milestone id and status, if this is a milestone
    #[must_use]
    pub fn milestone(&self) -> Option<(&str, MilestoneStatus)> {
        match &self.kind {
            InvariantKind::Milestone { id, status } => Some((id.as_str(), *status)),
            _ => None,
        }
    }
}

impl Display for Invariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

fn strip_article(subject: &str) -> &str {
    let trimmed = subject.trim();
    for article in ["the ", "The ", "a ", "A ", "an ", "An "] {
        if let Some(rest) = trimmed.strip_prefix(article) {
            return rest.trim_start();
        }
    }
    trimmed
}

/// Parse a list of invariant strings
pub fn parse_all<S: AsRef<str>>(texts: &[S]) -> Vec<Invariant> {
    texts.iter().map(|t| Invariant::parse(t.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_milestones() {
        let done = Invariant::parse("milestone: shard_bind = DONE");
        assert_eq!(done.milestone(), Some(("shard_bind", MilestoneStatus::Done)));

        let pending = Invariant::parse("Milestone:maps_acquired=NOT_YET");
        assert_eq!(
            pending.milestone(),
            Some(("maps_acquired", MilestoneStatus::NotYet))
        );
    }

    #[test]
    fn parses_facts() {
        let fact = Invariant::parse("The shard is physical.");
        assert_eq!(
            fact.kind(),
            &InvariantKind::Fact {
                subject: "shard".to_string(),
                condition: Condition::Physical,
            }
        );

        let alive = Invariant::parse("Tomas remains alive");
        assert!(matches!(
            alive.kind(),
            InvariantKind::Fact { subject, condition: Condition::Alive } if subject == "Tomas"
        ));
    }

    #[test]
    fn other_text_is_opaque() {
        let other = Invariant::parse("Mara never lies to Tomas");
        assert_eq!(other.kind(), &InvariantKind::Other);
        assert_eq!(other.text(), "Mara never lies to Tomas");
        assert_eq!(
            Invariant::parse("milestone: shard_bind = MAYBE").kind(),
            &InvariantKind::Other
        );
    }
}
