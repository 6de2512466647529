//! Pluggable heuristic rules
//!
//! Every rule reads a shared [`ScanContext`] and returns advisory [`Issue`]s.
//! Rules never fail; a rule that cannot make sense of an invariant skips it.
//!
//! These are heuristics. They catch the common ways generated prose breaks
//! continuity, not every way.

use crate::invariant::{parse_all, Invariant, InvariantKind, MilestoneStatus};
use crate::issue::{Issue, IssueCode};
use crate::patterns::{MilestonePatterns, NegationPatterns};
use crate::pov::{pov_drift_issues, PovMode};
use crate::text::{mask_dialogue, preceding_words, sentence_spans, word_pattern};
use crate::verb::MilestoneAction;
use serde_json::Value;

/// Everything a rule may look at for one scene
#[derive(Debug, Clone, Default)]
pub struct ScanContext<'a> {
    prose: &'a str,
    masked: String,
    summary: String,
    invariants: Vec<Invariant>,
    prior_invariants: Vec<Invariant>,
    pov_mode: Option<PovMode>,
}

impl<'a> ScanContext<'a> {
    /// Create context for a scene's prose
    #[must_use]
    pub fn new(prose: &'a str) -> Self {
        Self {
            prose,
            masked: mask_dialogue(prose),
            ..Self::default()
        }
    }

    /// Attach the proposed state update; its string values are scanned as summary text
    #[must_use]
    pub fn with_proposed_update(mut self, update: &Value) -> Self {
        let mut parts = Vec::new();
        collect_strings(update, &mut parts);
        self.summary = parts.join("\n");
        self
    }

    /// Set the invariants declared for this scene
    #[must_use]
    pub fn with_invariants<S: AsRef<str>>(mut self, invariants: &[S]) -> Self {
        self.invariants = parse_all(invariants);
        self
    }

    /// Set the invariants declared for the previous scene
    #[must_use]
    pub fn with_prior_invariants<S: AsRef<str>>(mut self, invariants: &[S]) -> Self {
        self.prior_invariants = parse_all(invariants);
        self
    }

    /// Set the narrative point of view
    #[must_use]
    pub fn with_pov_mode(mut self, mode: PovMode) -> Self {
        self.pov_mode = Some(mode);
        self
    }

    /// Raw prose
    #[inline]
    #[must_use]
    pub fn prose(&self) -> &str {
        self.prose
    }

    /// Prose with quoted dialogue blanked out, same byte offsets
    #[inline]
    #[must_use]
    pub fn narration(&self) -> &str {
        &self.masked
    }

    /// Text of the proposed state update
    #[inline]
    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Current invariants
    #[inline]
    #[must_use]
    pub fn invariants(&self) -> &[Invariant] {
        &self.invariants
    }

    /// Previous scene's invariants
    #[inline]
    #[must_use]
    pub fn prior_invariants(&self) -> &[Invariant] {
        &self.prior_invariants
    }

    /// Point of view, if declared
    #[inline]
    #[must_use]
    pub fn pov_mode(&self) -> Option<PovMode> {
        self.pov_mode
    }

    /// Narration sentences as `(narration, original)` pairs
    fn narration_sentences(&self) -> Vec<(&str, &str)> {
        sentence_spans(&self.masked)
            .into_iter()
            .map(|(s, e)| (&self.masked[s..e], self.prose.get(s..e).unwrap_or_default()))
            .collect()
    }

    /// Summary sentences, scanned as-is
    fn summary_sentences(&self) -> Vec<(&str, &str)> {
        sentence_spans(&self.summary)
            .into_iter()
            .map(|(s, e)| (&self.summary[s..e], &self.summary[s..e]))
            .collect()
    }
}

/// Whether a sentence mentions the milestone's object
///
/// An id with no object token (`bind`) matches every sentence.
fn names_object(object: Option<&regex::Regex>, sentence: &str) -> bool {
    match object {
        Some(re) => re.is_match(sentence),
        None => true,
    }
}

fn collect_strings(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

/// Heuristic check over a scene
pub trait Rule: Send + Sync + std::fmt::Debug {
    /// Rule name (for logging)
    fn name(&self) -> &'static str;

    /// Report issues; never fails
    fn check(&self, ctx: &ScanContext<'_>) -> Vec<Issue>;
}

/// Flags a completed milestone being enacted again
#[derive(Debug, Clone, Default)]
pub struct MilestoneDuplicateRule {
    patterns: MilestonePatterns,
}

impl MilestoneDuplicateRule {
    /// Create rule with custom patterns
    #[must_use]
    pub fn new(patterns: MilestonePatterns) -> Self {
        Self { patterns }
    }
}

impl Rule for MilestoneDuplicateRule {
    fn name(&self) -> &'static str {
        "milestone_duplicate"
    }

    fn check(&self, ctx: &ScanContext<'_>) -> Vec<Issue> {
        let repeat = word_pattern(&self.patterns.repetition_markers);
        let sentences = ctx.narration_sentences();
        let mut issues = Vec::new();

        for invariant in ctx.invariants() {
            let Some((id, MilestoneStatus::Done)) = invariant.milestone() else {
                continue;
            };
            let Some(action) = MilestoneAction::from_id(id) else {
                continue;
            };
            let Some(enacted) = word_pattern(&action.verb.enactments()) else {
                continue;
            };
            let object = word_pattern(&action.objects);

            let mut enactments: Vec<(&str, bool)> = Vec::new();
            for &(narration, original) in &sentences {
                if !names_object(object.as_ref(), narration) {
                    continue;
                }
                for found in enacted.find_iter(narration) {
                    let before = preceding_words(narration, found.start(), self.patterns.lookbehind);
                    if self.patterns.is_callback(&before) || self.patterns.is_negated(&before) {
                        continue;
                    }
                    let marked = repeat.as_ref().is_some_and(|re| re.is_match(narration));
                    enactments.push((original, marked));
                }
            }

            let flagged = enactments
                .iter()
                .find(|(_, marked)| *marked)
                .or_else(|| enactments.get(1));
            if let Some(&(excerpt, marked)) = flagged {
                let detail = if marked {
                    format!("milestone '{id}' is already DONE but '{}' is enacted again", action.verb.base())
                } else {
                    format!(
                        "milestone '{id}' is already DONE but '{}' is enacted {} times",
                        action.verb.base(),
                        enactments.len()
                    )
                };
                issues.push(Issue::new(
                    IssueCode::MilestoneDuplicate,
                    invariant.text(),
                    detail,
                    excerpt,
                ));
            }
        }
        issues
    }
}

/// Flags a pending milestone narrated as completed
#[derive(Debug, Clone, Default)]
pub struct MilestoneFutureRule {
    patterns: MilestonePatterns,
}

impl MilestoneFutureRule {
    /// Create rule with custom patterns
    #[must_use]
    pub fn new(patterns: MilestonePatterns) -> Self {
        Self { patterns }
    }

    fn completed_in<'s>(
        &self,
        action: &MilestoneAction,
        sentences: &[(&str, &'s str)],
    ) -> Option<&'s str> {
        let completed = word_pattern(action.verb.completed());
        let acquired = word_pattern(&self.patterns.acquisition_verbs);
        let object = word_pattern(&action.objects);

        for &(narration, original) in sentences {
            let affirmed = |re: &regex::Regex| {
                re.find_iter(narration).any(|m| {
                    let before = preceding_words(narration, m.start(), self.patterns.lookbehind);
                    !self.patterns.is_negated(&before)
                })
            };
            if !names_object(object.as_ref(), narration) {
                continue;
            }
            if completed.as_ref().is_some_and(affirmed) || acquired.as_ref().is_some_and(affirmed) {
                return Some(original);
            }
        }
        None
    }
}

impl Rule for MilestoneFutureRule {
    fn name(&self) -> &'static str {
        "milestone_future"
    }

    fn check(&self, ctx: &ScanContext<'_>) -> Vec<Issue> {
        let sentences = ctx.narration_sentences();
        let mut issues = Vec::new();

        for invariant in ctx.invariants() {
            let Some((id, MilestoneStatus::NotYet)) = invariant.milestone() else {
                continue;
            };
            let Some(action) = MilestoneAction::from_id(id) else {
                continue;
            };
            if let Some(excerpt) = self.completed_in(&action, &sentences) {
                issues.push(Issue::new(
                    IssueCode::MilestoneFuture,
                    invariant.text(),
                    format!("milestone '{id}' is NOT_YET but the prose narrates it as done"),
                    excerpt,
                ));
            }
        }
        issues
    }
}

/// Flags prose or summary negating a standing fact
#[derive(Debug, Clone, Default)]
pub struct ContradictionRule {
    patterns: NegationPatterns,
}

impl ContradictionRule {
    /// Create rule with custom patterns
    #[must_use]
    pub fn new(patterns: NegationPatterns) -> Self {
        Self { patterns }
    }
}

impl Rule for ContradictionRule {
    fn name(&self) -> &'static str {
        "contradiction"
    }

    fn check(&self, ctx: &ScanContext<'_>) -> Vec<Issue> {
        let mut sentences = ctx.narration_sentences();
        sentences.extend(ctx.summary_sentences());
        let mut issues = Vec::new();

        for invariant in ctx.invariants() {
            let InvariantKind::Fact { subject, condition } = invariant.kind() else {
                continue;
            };
            let mut names = vec![subject.clone()];
            if let Some(head) = subject.split_whitespace().last() {
                names.push(head.to_string());
            }
            let (Some(named), Some(negated)) = (
                word_pattern(&names),
                word_pattern(self.patterns.for_condition(*condition)),
            ) else {
                continue;
            };

            let hit = sentences.iter().find_map(|&(text, original)| {
                if !named.is_match(text) {
                    return None;
                }
                negated
                    .find_iter(text)
                    .find(|m| !self.patterns.is_guarded(&preceding_words(text, m.start(), 2)))
                    .map(|m| (original, m.as_str().to_string()))
            });
            if let Some((excerpt, word)) = hit {
                issues.push(Issue::new(
                    IssueCode::Contradiction,
                    invariant.text(),
                    format!("'{subject}' must stay {} but the text says '{word}'", condition.as_str()),
                    excerpt,
                ));
            }
        }
        issues
    }
}

/// Flags a milestone flipping from DONE back to NOT_YET between scenes
#[derive(Debug, Clone, Copy, Default)]
pub struct MilestoneRegressionRule;

impl Rule for MilestoneRegressionRule {
    fn name(&self) -> &'static str {
        "milestone_regression"
    }

    fn check(&self, ctx: &ScanContext<'_>) -> Vec<Issue> {
        ctx.invariants()
            .iter()
            .filter_map(|current| {
                let (id, MilestoneStatus::NotYet) = current.milestone()? else {
                    return None;
                };
                let was_done = ctx
                    .prior_invariants()
                    .iter()
                    .any(|prior| prior.milestone() == Some((id, MilestoneStatus::Done)));
                was_done.then(|| {
                    Issue::new(
                        IssueCode::Contradiction,
                        current.text(),
                        format!("milestone '{id}' was DONE and is now declared NOT_YET"),
                        "",
                    )
                })
            })
            .collect()
    }
}

/// Flags first-person narration in third-person scenes
#[derive(Debug, Clone, Copy, Default)]
pub struct PovDriftRule;

impl Rule for PovDriftRule {
    fn name(&self) -> &'static str {
        "pov_drift"
    }

    fn check(&self, ctx: &ScanContext<'_>) -> Vec<Issue> {
        ctx.pov_mode()
            .map(|mode| pov_drift_issues(ctx.prose(), mode))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn codes(issues: &[Issue]) -> Vec<IssueCode> {
        issues.iter().map(|i| i.code).collect()
    }

    #[test]
    fn done_milestone_repeated_with_marker() {
        let ctx = ScanContext::new("Mara bound the shard to her blade again.")
            .with_invariants(&["milestone: shard_bind = DONE"]);
        let issues = MilestoneDuplicateRule::default().check(&ctx);
        assert_eq!(codes(&issues), vec![IssueCode::MilestoneDuplicate]);
        assert_eq!(issues[0].excerpt, "Mara bound the shard to her blade again.");
    }

    #[test]
    fn done_milestone_enacted_twice() {
        let ctx = ScanContext::new("She bound the shard. At dusk she bound the shard.")
            .with_invariants(&["milestone: shard_bind = DONE"]);
        let issues = MilestoneDuplicateRule::default().check(&ctx);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].excerpt, "At dusk she bound the shard.");
    }

    #[test]
    fn past_perfect_is_a_callback() {
        let ctx = ScanContext::new(
            "She had bound the shard days ago. The shard she'd bound hummed again.",
        )
        .with_invariants(&["milestone: shard_bind = DONE"]);
        assert!(MilestoneDuplicateRule::default().check(&ctx).is_empty());
    }

    #[test]
    fn single_enactment_without_marker_is_fine() {
        let ctx = ScanContext::new("She bound the shard.")
            .with_invariants(&["milestone: shard_bind = DONE"]);
        assert!(MilestoneDuplicateRule::default().check(&ctx).is_empty());
    }

    #[test]
    fn other_objects_are_not_the_milestone() {
        let ctx = ScanContext::new("The guards bound his wrists. Later they bound his ankles again.")
            .with_invariants(&["milestone: shard_bind = DONE"]);
        assert!(MilestoneDuplicateRule::default().check(&ctx).is_empty());

        let ctx = ScanContext::new("Mara acquired a horse at the market.")
            .with_invariants(&["milestone: maps_acquired = NOT_YET"]);
        assert!(MilestoneFutureRule::default().check(&ctx).is_empty());
    }

    #[test]
    fn bare_verb_ids_match_any_object() {
        let ctx = ScanContext::new("She bound the wound again.")
            .with_invariants(&["milestone: bind = DONE"]);
        assert_eq!(
            codes(&MilestoneDuplicateRule::default().check(&ctx)),
            vec![IssueCode::MilestoneDuplicate]
        );
    }

    #[test]
    fn pending_milestone_narrated_as_done() {
        let ctx = ScanContext::new("By noon Mara had obtained the maps from the archive.")
            .with_invariants(&["milestone: maps_acquired = NOT_YET"]);
        let issues = MilestoneFutureRule::default().check(&ctx);
        assert_eq!(codes(&issues), vec![IssueCode::MilestoneFuture]);

        let direct = ScanContext::new("She acquired the map at last.")
            .with_invariants(&["milestone: maps_acquired = NOT_YET"]);
        assert_eq!(MilestoneFutureRule::default().check(&direct).len(), 1);
    }

    #[test]
    fn negated_completion_is_fine() {
        let ctx = ScanContext::new("She had not yet acquired the maps. She never obtained the maps.")
            .with_invariants(&["milestone: maps_acquired = NOT_YET"]);
        assert!(MilestoneFutureRule::default().check(&ctx).is_empty());
    }

    #[test]
    fn contradiction_in_prose_and_summary() {
        let ctx = ScanContext::new("The shard dissolves in her palm.")
            .with_invariants(&["the shard is physical"]);
        let issues = ContradictionRule::default().check(&ctx);
        assert_eq!(codes(&issues), vec![IssueCode::Contradiction]);
        assert!(issues[0].detail.contains("'dissolves'"));

        let summary = ScanContext::new("Nothing happens.")
            .with_invariants(&["Tomas is alive"])
            .with_proposed_update(&json!({"set": {"summary": "Tomas died at the gate."}}));
        assert_eq!(ContradictionRule::default().check(&summary).len(), 1);
    }

    #[test]
    fn guarded_negation_is_fine() {
        let ctx = ScanContext::new("Tomas nearly died at the gate. Tomas did not die.")
            .with_invariants(&["Tomas is alive"]);
        assert!(ContradictionRule::default().check(&ctx).is_empty());
    }

    #[test]
    fn milestone_regression() {
        let ctx = ScanContext::new("")
            .with_invariants(&["milestone: shard_bind = NOT_YET"])
            .with_prior_invariants(&["milestone: shard_bind = DONE"]);
        let issues = MilestoneRegressionRule.check(&ctx);
        assert_eq!(codes(&issues), vec![IssueCode::Contradiction]);

        let dropped = ScanContext::new("").with_prior_invariants(&["milestone: shard_bind = DONE"]);
        assert!(MilestoneRegressionRule.check(&dropped).is_empty());
    }

    #[test]
    fn pov_rule_needs_a_mode() {
        let ctx = ScanContext::new("I ran.");
        assert!(PovDriftRule.check(&ctx).is_empty());
        let ctx = ctx.with_pov_mode(PovMode::ThirdLimited);
        assert_eq!(codes(&PovDriftRule.check(&ctx)), vec![IssueCode::PovDrift]);
    }
}
