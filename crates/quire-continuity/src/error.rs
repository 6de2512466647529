//! Error types for continuity configuration
//!
//! Scanning itself never fails; these cover parsing of modes from config.

/// Errors while reading continuity settings
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContinuityError {
    /// POV mode name not recognized
    #[error("unknown POV mode '{0}'")]
    UnknownPovMode(String),

    /// Scan mode name not recognized
    #[error("unknown scan mode '{0}' (expected strict, warn or off)")]
    UnknownScanMode(String),
}
