//! Error types for prompt rendering and composition
//!
//! Provides error handling for:
//! - Rendering (unresolved or malformed placeholders)
//! - Registry loading (missing version, bad paths)
//! - Composition integrity (unknown tokens, drift, nondeterminism, encoding)

use crate::text::EncodingViolation;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Errors during template rendering
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Placeholder with no value in the context
    #[error("unresolved placeholder: {{{{{name}}}}}")]
    UnresolvedPlaceholder { name: String },

    /// `{{...}}` token that does not hold a valid name
    #[error("malformed placeholder: {raw}")]
    MalformedPlaceholder { raw: String },
}

/// Errors while loading a template registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Document lacks the required `version` string
    #[error("registry is missing required field 'version'")]
    MissingVersion,

    /// Document lacks the required `templates` mapping
    #[error("registry is missing required field 'templates'")]
    MissingTemplates,

    /// Template path escapes the source root
    #[error("template '{name}' has invalid path '{path}': must be relative and stay inside the source root")]
    InvalidPath { name: String, path: String },

    /// Malformed JSON
    #[error("invalid registry json: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error reading the registry file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Placeholder audit failure for one template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTokens {
    /// Template name
    pub template: String,
    /// Tokens not known to the template's schema
    pub tokens: Vec<String>,
}

/// Errors during catalog composition
///
/// All variants are fatal: composition never yields a partial template set.
#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    /// Registry problem
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Registry entries do not match the closed catalog
    #[error("catalog mismatch: missing [{}], unexpected [{}]", .missing.join(", "), .unexpected.join(", "))]
    CatalogMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    /// Template source could not be read
    #[error("cannot read source for template '{template}' at {path}: {source}")]
    Source {
        template: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Partial referenced but not registered
    #[error("template '{template}' includes unknown partial '{partial}'")]
    MissingPartial { template: String, partial: String },

    /// Partials include each other
    #[error("partial include cycle: {}", .chain.join(" -> "))]
    PartialCycle { chain: Vec<String> },

    /// Template contains a malformed placeholder
    #[error("template '{template}': {source}")]
    Render {
        template: String,
        #[source]
        source: RenderError,
    },

    /// Placeholder audit found tokens outside the schema
    #[error("unknown template tokens: {}", describe_unknown(.offenders))]
    UnknownTokens { offenders: Vec<UnknownTokens> },

    /// Output violates the encoding policy
    #[error("encoding policy violated in '{template}': {violation}")]
    Encoding {
        template: String,
        violation: EncodingViolation,
    },

    /// Checksums differ from the committed reference
    #[error("template checksum drift: {}", .templates.join(", "))]
    ChecksumDrift { templates: Vec<String> },

    /// Two runs over the same inputs disagreed
    #[error("non-deterministic composition: {}", .templates.join(", "))]
    NonDeterministic { templates: Vec<String> },

    /// Written file count differs from the catalog size
    #[error("expected {expected} compiled templates on disk, found {actual}")]
    FileCount { expected: usize, actual: usize },

    /// Reference checksum file is malformed
    #[error("invalid checksum file {path}: {source}")]
    ChecksumFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// IO error on the output location
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CompositionError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn describe_unknown(offenders: &[UnknownTokens]) -> String {
    let mut out = String::new();
    for (i, o) in offenders.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let _ = write!(out, "{} [{}]", o.template, o.tokens.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_display_shows_braces() {
        let err = RenderError::UnresolvedPlaceholder {
            name: "hero".to_string(),
        };
        assert_eq!(err.to_string(), "unresolved placeholder: {{hero}}");
    }

    #[test]
    fn unknown_tokens_display() {
        let err = CompositionError::UnknownTokens {
            offenders: vec![
                UnknownTokens {
                    template: "scene_draft".to_string(),
                    tokens: vec!["a".to_string(), "b".to_string()],
                },
                UnknownTokens {
                    template: "summary".to_string(),
                    tokens: vec!["c".to_string()],
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "unknown template tokens: scene_draft [a, b]; summary [c]"
        );
    }

    #[test]
    fn registry_error_converts() {
        let err: CompositionError = RegistryError::MissingVersion.into();
        assert!(matches!(err, CompositionError::Registry(RegistryError::MissingVersion)));
    }
}
