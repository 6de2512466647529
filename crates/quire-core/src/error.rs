//! Error types for the scene pipeline
//!
//! Provides error handling for:
//! - Configuration loading
//! - Run log IO
//! - Model transport failures
//! - The umbrella [`QuireError`] every pipeline operation returns

use quire_continuity::{ContinuityError, Issue};
use quire_prompt::{BudgetReport, CompositionError, RegistryError, RenderError};
use quire_state::{ContinuityError as PackError, MergeError, ParseError, PatchError, SchemaError};
use std::path::PathBuf;
use std::time::Duration;

/// Main pipeline error type
#[derive(Debug, thiserror::Error)]
pub enum QuireError {
    /// Configuration failed to load or validate
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Template rendering failed
    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    /// Template registry failed to load
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Prompt catalog composition failed
    #[error("composition failed: {0}")]
    Composition(#[from] CompositionError),

    /// Rendered prompt exceeds its budget
    #[error("prompt for step '{}' is over budget ({} tokens)", .report.step, .report.total_tokens)]
    OverBudget {
        /// Full budget report
        report: Box<BudgetReport>,
    },

    /// Model transport failed
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Model response could not be parsed
    #[error("response parse failed: {0}")]
    Parse(#[from] ParseError),

    /// Patch failed schema validation
    #[error("schema validation failed: {0}")]
    Schema(#[from] SchemaError),

    /// Patch document is malformed
    #[error("invalid state patch: {0}")]
    Patch(#[from] PatchError),

    /// Patch could not be merged
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// Continuity pack is missing or mistyped fields
    #[error("continuity pack invalid: {0}")]
    Pack(#[from] PackError),

    /// Continuity settings are invalid
    #[error("continuity error: {0}")]
    Continuity(#[from] ContinuityError),

    /// Strict scan found issues; nothing was committed
    #[error("continuity scan blocked commit with {} issue(s)", .issues.len())]
    ScanBlocked {
        /// Findings that blocked the commit
        issues: Vec<Issue>,
    },

    /// Run log could not be written
    #[error("run log error: {0}")]
    RunLog(#[from] RunLogError),
}

impl QuireError {
    /// Check if retrying the same scene request might succeed
    ///
    /// Parse and schema failures depend on model output, so a fresh
    /// completion may fix them.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retryable(),
            Self::Parse(_)
            | Self::Schema(_)
            | Self::Patch(_)
            | Self::Pack(_)
            | Self::ScanBlocked { .. } => true,
            _ => false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading the config file
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML
    #[error("invalid toml: {0}")]
    Toml(#[from] toml::de::Error),

    /// Malformed JSON
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// File extension is neither `.toml` nor `.json`
    #[error("unsupported config format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Values are individually valid but inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Run log errors
#[derive(Debug, thiserror::Error)]
pub enum RunLogError {
    /// IO error on the log file
    #[error("io error on run log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Record could not be serialized
    #[error("run log record is not serializable: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Model transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Provider could not be reached
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Provider asked us to slow down
    #[error("rate limited; retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Provider rejected the request
    #[error("provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// No response left (scripted transports)
    #[error("no response available")]
    Exhausted,
}

impl TransportError {
    /// Check if the request may succeed when repeated
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::RateLimited { .. } => true,
            Self::Provider { status, .. } => *status >= 500,
            Self::Exhausted => false,
        }
    }
}
