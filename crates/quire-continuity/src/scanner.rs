//! Rule scanner and scan modes
//!
//! [`InvariantScanner`] runs a list of [`Rule`]s over one [`ScanContext`].
//! [`ScanMode`] decides what the caller does with the findings.

use crate::error::ContinuityError;
use crate::issue::Issue;
use crate::patterns::{MilestonePatterns, NegationPatterns};
use crate::rules::{
    ContradictionRule, MilestoneDuplicateRule, MilestoneFutureRule, MilestoneRegressionRule,
    PovDriftRule, Rule, ScanContext,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// What to do with heuristic findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Any issue blocks the commit
    Strict,

    /// Issues are logged and the commit proceeds
    #[default]
    Warn,

    /// Scanning is skipped
    Off,
}

impl Display for ScanMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strict => "strict",
            Self::Warn => "warn",
            Self::Off => "off",
        })
    }
}

impl FromStr for ScanMode {
    type Err = ContinuityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "warn" => Ok(Self::Warn),
            "off" => Ok(Self::Off),
            _ => Err(ContinuityError::UnknownScanMode(s.to_string())),
        }
    }
}

/// Findings plus the commit decision for one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Everything the rules reported
    pub issues: Vec<Issue>,

    /// Whether the commit must not proceed
    pub blocked: bool,
}

impl ScanOutcome {
    /// Check if nothing was found
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Ordered set of rules
#[derive(Debug)]
pub struct InvariantScanner {
    rules: Vec<Box<dyn Rule>>,
}

impl Default for InvariantScanner {
    fn default() -> Self {
        Self::with_patterns(MilestonePatterns::default(), NegationPatterns::default())
    }
}

impl InvariantScanner {
    /// Create scanner with no rules
    #[must_use]
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create scanner with every built-in rule using the given patterns
    #[must_use]
    pub fn with_patterns(milestones: MilestonePatterns, negations: NegationPatterns) -> Self {
        Self::invariant_rules(milestones, negations).with_rule(PovDriftRule)
    }

    /// Built-in invariant rules only (no POV check)
    #[must_use]
    pub fn invariant_rules(milestones: MilestonePatterns, negations: NegationPatterns) -> Self {
        Self::empty()
            .with_rule(ContradictionRule::new(negations))
            .with_rule(MilestoneRegressionRule)
            .with_rule(MilestoneDuplicateRule::new(milestones.clone()))
            .with_rule(MilestoneFutureRule::new(milestones))
    }

    /// Append a rule
    #[must_use]
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Rule names in run order
    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.iter().map(|r| r.name())
    }

    /// Run every rule
    #[must_use]
    pub fn scan(&self, ctx: &ScanContext<'_>) -> Vec<Issue> {
        let issues: Vec<Issue> = self.rules.iter().flat_map(|rule| rule.check(ctx)).collect();
        tracing::debug!(
            rules = self.rules.len(),
            issues = issues.len(),
            "continuity scan complete"
        );
        issues
    }

    /// Run the rules and decide per mode
    ///
    /// `Warn` logs each finding at warn level; `Off` runs nothing.
    #[must_use]
    pub fn gate(&self, ctx: &ScanContext<'_>, mode: ScanMode) -> ScanOutcome {
        if mode == ScanMode::Off {
            return ScanOutcome {
                issues: Vec::new(),
                blocked: false,
            };
        }
        let issues = self.scan(ctx);
        if mode == ScanMode::Warn {
            for issue in &issues {
                tracing::warn!(
                    code = %issue.code,
                    invariant = %issue.invariant,
                    excerpt = %issue.excerpt,
                    "{}",
                    issue.detail
                );
            }
        }
        ScanOutcome {
            blocked: mode == ScanMode::Strict && !issues.is_empty(),
            issues,
        }
    }
}

/// Check prose and a proposed state update against declared invariants
///
/// Only `invariants` are checked; `prior_invariants` is consulted to catch a
/// milestone flipping from DONE back to NOT_YET. Never fails.
#[must_use]
pub fn heuristic_invariant_issues<S: AsRef<str>>(
    prose: &str,
    proposed_state_update: Option<&Value>,
    invariants: &[S],
    prior_invariants: &[S],
) -> Vec<Issue> {
    let mut ctx = ScanContext::new(prose)
        .with_invariants(invariants)
        .with_prior_invariants(prior_invariants);
    if let Some(update) = proposed_state_update {
        ctx = ctx.with_proposed_update(update);
    }
    InvariantScanner::invariant_rules(MilestonePatterns::default(), NegationPatterns::default())
        .scan(&ctx)
}
