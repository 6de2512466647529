//! Token budget evaluation
//!
//! A cheap length-based estimate (`ceil(chars / 4)`) checked against per-step
//! ceilings. The evaluator only reports; it never trims content.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Budget key holding the aggregate ceiling for a step
pub const TOTAL_KEY: &str = "total";

/// Estimate the token count of a text
///
/// Zero for empty text, otherwise `ceil(chars / 4)` with a floor of one.
/// Characters are Unicode scalar values, not bytes.
#[inline]
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.chars().count().div_ceil(4).max(1)
}

/// Token ceilings per segment for one step
///
/// The reserved [`TOTAL_KEY`] entry bounds the sum of all segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepBudget {
    ceilings: BTreeMap<String, usize>,
}

impl StepBudget {
    /// Create empty (unconstrained) step budget
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a ceiling for one segment
    #[must_use]
    pub fn with_segment(mut self, segment: impl Into<String>, ceiling: usize) -> Self {
        self.ceilings.insert(segment.into(), ceiling);
        self
    }

    /// With an aggregate ceiling
    #[must_use]
    pub fn with_total(mut self, ceiling: usize) -> Self {
        self.ceilings.insert(TOTAL_KEY.to_string(), ceiling);
        self
    }

    /// Ceiling for a segment, if configured
    #[inline]
    #[must_use]
    pub fn segment(&self, segment: &str) -> Option<usize> {
        if segment == TOTAL_KEY {
            return None;
        }
        self.ceilings.get(segment).copied()
    }

    /// Aggregate ceiling, if configured
    #[inline]
    #[must_use]
    pub fn total(&self) -> Option<usize> {
        self.ceilings.get(TOTAL_KEY).copied()
    }
}

/// Per-step budget table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BudgetTable {
    steps: BTreeMap<String, StepBudget>,
}

impl BudgetTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With budget for a step
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>, budget: StepBudget) -> Self {
        self.steps.insert(step.into(), budget);
        self
    }

    /// Budget for a step, if configured
    #[inline]
    #[must_use]
    pub fn step(&self, step: &str) -> Option<&StepBudget> {
        self.steps.get(step)
    }

    /// Number of configured steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Check if no step is configured
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Measurement of one prompt segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionReport {
    /// Segment name
    pub name: String,
    /// Character count
    pub chars: usize,
    /// Estimated tokens
    pub tokens: usize,
    /// Configured ceiling
    pub limit: Option<usize>,
    /// Ceiling exists and is exceeded
    pub over_budget: bool,
}

/// Budget evaluation for one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetReport {
    /// Step the segments belong to
    pub step: String,
    /// Segments in name order
    pub sections: Vec<SectionReport>,
    /// Sum of segment tokens
    pub total_tokens: usize,
    /// Aggregate ceiling
    pub total_limit: Option<usize>,
    /// Any segment over, or the total over
    pub over_budget: bool,
}

impl BudgetReport {
    /// Sections exceeding their ceiling
    pub fn over_sections(&self) -> impl Iterator<Item = &SectionReport> {
        self.sections.iter().filter(|s| s.over_budget)
    }

    /// Aggregate ceiling exists and is exceeded
    #[inline]
    #[must_use]
    pub fn total_over(&self) -> bool {
        self.total_limit.is_some_and(|limit| self.total_tokens > limit)
    }
}

/// Evaluate prompt segments against a step's ceilings
///
/// A missing step or segment ceiling means unconstrained, not an error.
/// Sections are reported in name order regardless of input order.
#[must_use]
pub fn evaluate_budget<'a, I>(step: &str, segments: I, budgets: &BudgetTable) -> BudgetReport
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let step_budget = budgets.step(step);
    let ordered: BTreeMap<&str, &str> = segments.into_iter().collect();

    let sections: Vec<SectionReport> = ordered
        .into_iter()
        .map(|(name, text)| {
            let tokens = estimate_tokens(text);
            let limit = step_budget.and_then(|b| b.segment(name));
            SectionReport {
                name: name.to_string(),
                chars: text.chars().count(),
                tokens,
                limit,
                over_budget: limit.is_some_and(|l| tokens > l),
            }
        })
        .collect();

    let total_tokens = sections.iter().map(|s| s.tokens).sum();
    let total_limit = step_budget.and_then(StepBudget::total);
    let total_over = total_limit.is_some_and(|l| total_tokens > l);
    let over_budget = total_over || sections.iter().any(|s| s.over_budget);

    BudgetReport {
        step: step.to_string(),
        sections,
        total_tokens,
        total_limit,
        over_budget,
    }
}
