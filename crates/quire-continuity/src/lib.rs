//! Quire Continuity Heuristics
//!
//! Best-effort lint over generated prose and proposed state changes. The
//! rules are heuristics: they catch common continuity breaks, not all of them.
//!
//! # Core Concepts
//!
//! - [`Invariant`]: declared fact or milestone (`milestone: shard_bind = DONE`)
//! - [`Rule`]: pluggable check over a [`ScanContext`]
//! - [`Issue`]: advisory finding with an [`IssueCode`]
//! - [`InvariantScanner`]: ordered rules plus a [`ScanMode`] gate
//! - [`MilestonePatterns`] / [`NegationPatterns`]: tunable word lists
//!
//! # Example
//!
//! ```rust
//! use quire_continuity::{heuristic_invariant_issues, IssueCode};
//!
//! let issues = heuristic_invariant_issues(
//!     "Mara bound the shard to her blade again.",
//!     None,
//!     &["milestone: shard_bind = DONE"],
//!     &[] as &[&str],
//! );
//! assert_eq!(issues[0].code, IssueCode::MilestoneDuplicate);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
mod error;
mod invariant;
mod issue;
mod patterns;
mod pov;
pub mod rules;
mod scanner;
mod text;
mod verb;

// Re-exports
pub use error::ContinuityError;
pub use invariant::{parse_all, Condition, Invariant, InvariantKind, MilestoneStatus};
pub use issue::{Issue, IssueCode};
pub use patterns::{MilestonePatterns, NegationPatterns};
pub use pov::{pov_drift_issues, PovMode};
pub use rules::{Rule, ScanContext};
pub use scanner::{heuristic_invariant_issues, InvariantScanner, ScanMode, ScanOutcome};
pub use verb::{MilestoneAction, VerbForms};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
