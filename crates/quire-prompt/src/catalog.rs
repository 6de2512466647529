//! Closed template catalog
//!
//! The catalog fixes which templates a composition must produce and which
//! placeholder tokens each one may reference.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Tokens a template is allowed to reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateSchema {
    tokens: BTreeSet<String>,
}

impl TemplateSchema {
    /// Create schema from a token list
    #[must_use]
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if a token is known
    ///
    /// A dotted token (`hero.name`) is known when its root segment is.
    #[must_use]
    pub fn knows(&self, token: &str) -> bool {
        if self.tokens.contains(token) {
            return true;
        }
        token
            .split_once('.')
            .is_some_and(|(root, _)| self.tokens.contains(root))
    }

    /// Known tokens, sorted
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }
}

/// Reference catalog: template name and its allowed tokens
const REFERENCE: [(&str, &[&str]); 14] = [
    ("system", &["book_title", "genre", "pov_mode", "tense"]),
    ("series_outline", &["series_title", "premise", "book_count"]),
    ("book_outline", &["book_title", "premise", "chapter_count", "series_summary"]),
    ("chapter_plan", &["book_title", "chapter_number", "outline", "prior_summary"]),
    (
        "scene_plan",
        &["chapter_number", "scene_number", "chapter_plan", "continuity_pack", "invariants"],
    ),
    (
        "scene_draft",
        &["scene_plan", "continuity_pack", "state", "invariants", "pov_mode", "target_words"],
    ),
    ("scene_continue", &["prose_so_far", "scene_plan", "target_words"]),
    ("state_patch", &["prose", "state", "registries"]),
    ("continuity_pack", &["prose", "continuity_pack", "state"]),
    ("scene_lint", &["prose", "invariants", "pov_mode"]),
    ("scene_repair", &["prose", "issues", "invariants"]),
    ("scene_summary", &["prose", "prior_summary"]),
    ("character_update", &["character", "prose", "state"]),
    ("style_pass", &["prose", "style_guide"]),
];

/// Closed set of templates a composition must produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateCatalog {
    entries: BTreeMap<String, TemplateSchema>,
}

impl TemplateCatalog {
    /// Create catalog from explicit entries
    #[must_use]
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, TemplateSchema)>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(n, s)| (n.into(), s)).collect(),
        }
    }

    /// The fourteen-template catalog of the scene pipeline
    #[must_use]
    pub fn reference() -> Self {
        Self::new(
            REFERENCE
                .iter()
                .map(|(name, tokens)| (*name, TemplateSchema::new(tokens.iter().copied()))),
        )
    }

    /// Number of templates
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if a template belongs to the catalog
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Schema for a template
    #[inline]
    #[must_use]
    pub fn schema(&self, name: &str) -> Option<&TemplateSchema> {
        self.entries.get(name)
    }

    /// Template names, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Iterate name/schema pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TemplateSchema)> {
        self.entries.iter().map(|(n, s)| (n.as_str(), s))
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::reference()
    }
}
