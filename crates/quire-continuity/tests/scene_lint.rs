//! Functional tests for linting a generated scene.
//!
//! One scene, several declared invariants, all rules at once:
//! - a DONE milestone enacted again is a duplicate
//! - a NOT_YET milestone narrated as done is a future leak
//! - a standing fact negated in the proposed summary is a contradiction
//! - first-person narration in a third-limited scene is drift
//! - custom rules plug in beside the built-in ones

use pretty_assertions::assert_eq;
use quire_continuity::{
    InvariantScanner, Issue, IssueCode, MilestonePatterns, NegationPatterns, PovMode, Rule,
    ScanContext, ScanMode,
};
use serde_json::json;

const SCENE: &str = "Mara knelt by the well. She bound the shard to her blade once more, \
and the steel sang. By dusk she had secured the maps from the archive.\n\
\"I won't leave you,\" she told Tomas. I followed them into the dark.";

const INVARIANTS: &[&str] = &[
    "milestone: shard_bind = DONE",
    "milestone: maps_acquired = NOT_YET",
    "the shard is physical",
    "Tomas is alive",
];

/// Helper: sorted codes for order-insensitive comparison.
fn codes(issues: &[Issue]) -> Vec<IssueCode> {
    let mut codes: Vec<_> = issues.iter().map(|i| i.code).collect();
    codes.sort();
    codes
}

#[test]
fn every_rule_fires_on_a_broken_scene() {
    let update = json!({"set": {"summary": "Tomas died at the well."}});
    let ctx = ScanContext::new(SCENE)
        .with_invariants(INVARIANTS)
        .with_proposed_update(&update)
        .with_pov_mode(PovMode::ThirdLimited);

    let issues = InvariantScanner::default().scan(&ctx);
    assert_eq!(
        codes(&issues),
        vec![
            IssueCode::Contradiction,
            IssueCode::MilestoneDuplicate,
            IssueCode::MilestoneFuture,
            IssueCode::PovDrift,
        ]
    );

    let drift = issues.iter().find(|i| i.code == IssueCode::PovDrift).unwrap();
    assert_eq!(drift.excerpt, "I followed them into the dark.");

    let leak = issues.iter().find(|i| i.code == IssueCode::MilestoneFuture).unwrap();
    assert_eq!(leak.invariant, "milestone: maps_acquired = NOT_YET");
}

#[test]
fn clean_scene_passes_strict_mode() {
    let scene = "Mara knelt by the well. The shard she had bound hummed against the steel. \
                 Tomas kept watch.";
    let ctx = ScanContext::new(scene)
        .with_invariants(INVARIANTS)
        .with_pov_mode(PovMode::ThirdLimited);
    let outcome = InvariantScanner::default().gate(&ctx, ScanMode::Strict);
    assert!(outcome.is_clean(), "unexpected issues: {:?}", outcome.issues);
    assert!(!outcome.blocked);
}

#[test]
fn repetition_markers_are_tunable() {
    let scene = "She bound the shard anew.";
    let ctx = ScanContext::new(scene).with_invariants(&["milestone: shard_bind = DONE"]);

    let default = InvariantScanner::default();
    assert_eq!(codes(&default.scan(&ctx)), vec![IssueCode::MilestoneDuplicate]);

    let relaxed = InvariantScanner::with_patterns(
        MilestonePatterns::default().with_repetition_markers(&["again"]),
        NegationPatterns::default(),
    );
    assert!(relaxed.scan(&ctx).is_empty());
}

/// Helper rule: forbids a single word anywhere in the prose.
#[derive(Debug)]
struct ForbiddenWord(&'static str);

impl Rule for ForbiddenWord {
    fn name(&self) -> &'static str {
        "forbidden_word"
    }

    fn check(&self, ctx: &ScanContext<'_>) -> Vec<Issue> {
        if ctx.narration().contains(self.0) {
            vec![Issue::new(
                IssueCode::Contradiction,
                "",
                format!("'{}' must not appear", self.0),
                "",
            )]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn custom_rules_plug_in() {
    let scanner = InvariantScanner::empty().with_rule(ForbiddenWord("dragon"));
    let ctx = ScanContext::new("A dragon circled.");
    let outcome = scanner.gate(&ctx, ScanMode::Warn);
    assert_eq!(outcome.issues.len(), 1);
    assert!(!outcome.blocked);
}
