//! Point-of-view drift
//!
//! Third-person scenes must not slip into first-person narration. Dialogue is
//! exempt: a character saying "I" inside quotes is not drift.

use crate::error::ContinuityError;
use crate::issue::{Issue, IssueCode};
use crate::text::{mask_dialogue, sentence_spans};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

static FIRST_PERSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:I|(?i:me|my|mine|myself|we|us|our|ours|ourselves))\b")
        .expect("pronoun pattern is valid")
});

/// Narrative point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PovMode {
    /// "I walked"
    FirstPerson,

    /// "You walk"
    SecondPerson,

    /// Third person, one character's head
    ThirdLimited,

    /// Third person, any character's head
    ThirdOmniscient,

    /// Third person, no interiority
    ThirdObjective,
}

impl PovMode {
    /// Check if narration must avoid first-person pronouns
    #[inline]
    #[must_use]
    pub fn is_third_person(self) -> bool {
        matches!(
            self,
            Self::ThirdLimited | Self::ThirdOmniscient | Self::ThirdObjective
        )
    }

    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstPerson => "first_person",
            Self::SecondPerson => "second_person",
            Self::ThirdLimited => "third_limited",
            Self::ThirdOmniscient => "third_omniscient",
            Self::ThirdObjective => "third_objective",
        }
    }
}

impl Display for PovMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PovMode {
    type Err = ContinuityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "first_person" | "first" => Ok(Self::FirstPerson),
            "second_person" | "second" => Ok(Self::SecondPerson),
            "third_limited" | "third_person_limited" | "third" | "third_person" => {
                Ok(Self::ThirdLimited)
            }
            "third_omniscient" | "third_person_omniscient" | "omniscient" => {
                Ok(Self::ThirdOmniscient)
            }
            "third_objective" | "third_person_objective" | "objective" => {
                Ok(Self::ThirdObjective)
            }
            _ => Err(ContinuityError::UnknownPovMode(s.to_string())),
        }
    }
}

/// Report first-person narration outside dialogue
///
/// One issue per offending sentence. First- and second-person modes never
/// drift.
#[must_use]
pub fn pov_drift_issues(prose: &str, pov_mode: PovMode) -> Vec<Issue> {
    if !pov_mode.is_third_person() {
        return Vec::new();
    }

    let masked = mask_dialogue(prose);
    let mut issues = Vec::new();
    for (start, end) in sentence_spans(&masked) {
        let Some(found) = FIRST_PERSON.find(&masked[start..end]) else {
            continue;
        };
        let excerpt = prose.get(start..end).unwrap_or_default();
        issues.push(Issue::new(
            IssueCode::PovDrift,
            "",
            format!(
                "first-person pronoun '{}' in {pov_mode} narration",
                found.as_str()
            ),
            excerpt,
        ));
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_person_flags_narration_pronouns() {
        let prose = "Mara climbed the wall. I watched her go.";
        let issues = pov_drift_issues(prose, PovMode::ThirdLimited);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::PovDrift);
        assert_eq!(issues[0].excerpt, "I watched her go.");
    }

    #[test]
    fn dialogue_is_exempt() {
        let prose = "\"I will not wait for us,\" Mara said. She left.";
        assert!(pov_drift_issues(prose, PovMode::ThirdLimited).is_empty());

        let single = "'I ran,' she said. Tomas didn't believe her.";
        assert!(pov_drift_issues(single, PovMode::ThirdLimited).is_empty());
    }

    #[test]
    fn first_person_modes_never_drift() {
        let prose = "I climbed the wall. We waited.";
        assert!(pov_drift_issues(prose, PovMode::FirstPerson).is_empty());
        assert!(pov_drift_issues(prose, PovMode::SecondPerson).is_empty());
        assert_eq!(pov_drift_issues(prose, PovMode::ThirdOmniscient).len(), 2);
    }

    #[test]
    fn pronouns_inside_words_do_not_match() {
        let prose = "The museum was empty. Ourania smiled. The usher nodded.";
        assert!(pov_drift_issues(prose, PovMode::ThirdLimited).is_empty());

        let issues = pov_drift_issues("The road led home to us.", PovMode::ThirdObjective);
        assert!(issues[0].detail.contains("'us'"));
    }

    #[test]
    fn parses_mode_names() {
        assert_eq!("third_limited".parse::<PovMode>().unwrap(), PovMode::ThirdLimited);
        assert_eq!("Third Omniscient".parse::<PovMode>().unwrap(), PovMode::ThirdOmniscient);
        assert_eq!("first-person".parse::<PovMode>().unwrap(), PovMode::FirstPerson);
        assert!("sideways".parse::<PovMode>().is_err());
    }
}
