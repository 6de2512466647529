//! Tunable word lists behind the heuristic rules
//!
//! Each detector reads its own list so false positives can be tuned per
//! detector without touching the others.

use crate::invariant::Condition;
use serde::{Deserialize, Serialize};

fn strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

/// Word lists for the milestone detectors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestonePatterns {
    /// Markers that turn a single enactment into a repeat
    pub repetition_markers: Vec<String>,

    /// Verbs that complete an acquisition when paired with the object noun
    pub acquisition_verbs: Vec<String>,

    /// Words just before the verb that make it a callback, not an enactment
    pub callback_markers: Vec<String>,

    /// Words just before the verb that negate it
    pub negations: Vec<String>,

    /// How many preceding words are inspected for callbacks and negations
    pub lookbehind: usize,
}

impl Default for MilestonePatterns {
    fn default() -> Self {
        Self {
            repetition_markers: strings(&[
                "again",
                "once more",
                "a second time",
                "anew",
                "yet again",
                "all over again",
            ]),
            acquisition_verbs: strings(&[
                "acquired",
                "obtained",
                "secured",
                "retrieved",
                "claimed",
                "seized",
            ]),
            callback_markers: strings(&["had", "hadn't", "remembered", "recalled"]),
            negations: strings(&["not", "never", "nearly", "almost", "yet"]),
            lookbehind: 3,
        }
    }
}

impl MilestonePatterns {
    /// Replace repetition markers
    #[must_use]
    pub fn with_repetition_markers(mut self, markers: &[&str]) -> Self {
        self.repetition_markers = strings(markers);
        self
    }

    /// Replace acquisition verbs
    #[must_use]
    pub fn with_acquisition_verbs(mut self, verbs: &[&str]) -> Self {
        self.acquisition_verbs = strings(verbs);
        self
    }

    /// Set lookbehind window
    #[must_use]
    pub fn with_lookbehind(mut self, words: usize) -> Self {
        self.lookbehind = words;
        self
    }

    /// Check if the words before a verb make it a callback
    ///
    /// Contractions like `she'd` count as `had`.
    #[must_use]
    pub fn is_callback(&self, preceding: &[String]) -> bool {
        preceding.iter().any(|w| {
            w.ends_with("'d") || self.callback_markers.iter().any(|m| m.eq_ignore_ascii_case(w))
        })
    }

    /// Check if the words before a verb negate it
    #[must_use]
    pub fn is_negated(&self, preceding: &[String]) -> bool {
        preceding.iter().any(|w| {
            w.ends_with("n't") || self.negations.iter().any(|m| m.eq_ignore_ascii_case(w))
        })
    }
}

/// Words narrating the loss of each standing condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegationPatterns {
    /// Negates `present`
    pub present: Vec<String>,

    /// Negates `physical`
    pub physical: Vec<String>,

    /// Negates `intact`
    pub intact: Vec<String>,

    /// Negates `alive`
    pub alive: Vec<String>,

    /// Words just before a negating word that cancel it (`never died`)
    pub guards: Vec<String>,
}

impl Default for NegationPatterns {
    fn default() -> Self {
        Self {
            present: strings(&[
                "vanishes",
                "vanished",
                "disappears",
                "disappeared",
                "departs",
                "departed",
                "is gone",
                "was gone",
                "destroyed",
            ]),
            physical: strings(&[
                "dissolves",
                "dissolved",
                "vanishes",
                "vanished",
                "turns to mist",
                "turned to mist",
                "incorporeal",
                "insubstantial",
                "destroyed",
            ]),
            intact: strings(&[
                "shatters",
                "shattered",
                "breaks",
                "broke",
                "broken",
                "cracks",
                "cracked",
                "crumbles",
                "crumbled",
                "destroyed",
            ]),
            alive: strings(&[
                "dies",
                "died",
                "dead",
                "killed",
                "slain",
                "perishes",
                "perished",
            ]),
            guards: strings(&["not", "never", "nearly", "almost"]),
        }
    }
}

impl NegationPatterns {
    /// Words negating a condition
    #[must_use]
    pub fn for_condition(&self, condition: Condition) -> &[String] {
        match condition {
            Condition::Present => &self.present,
            Condition::Physical => &self.physical,
            Condition::Intact => &self.intact,
            Condition::Alive => &self.alive,
        }
    }

    /// Check if the words before a negating word cancel it
    #[must_use]
    pub fn is_guarded(&self, preceding: &[String]) -> bool {
        preceding
            .iter()
            .any(|w| w.ends_with("n't") || self.guards.iter().any(|g| g.eq_ignore_ascii_case(w)))
    }
}
