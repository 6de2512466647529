//! Functional tests for driving scenes through the pipeline.
//!
//! Each test runs the full request flow against a scripted transport:
//! - a rendered prompt reaches the provider as system + user messages
//! - the response is parsed, scanned and committed in one step
//! - failures at any stage leave the canonical state untouched
//! - invariants carry over between scenes so regressions are caught
//! - the run log records every committed or blocked scene

use pretty_assertions::assert_eq;
use quire_continuity::{IssueCode, ScanMode};
use quire_core::{
    PipelineConfig, QuireError, RunLog, ScenePipeline, SceneRequest, TransportError,
};
use quire_prompt::RenderContext;
use quire_test_utils::{
    sample_continuity_pack, sample_state, scene_response, ScriptedTransport,
};
use serde_json::{json, Value};
use std::path::Path;

/// Helper: scene request with a small plan payload.
fn request(plan: &str) -> SceneRequest {
    SceneRequest::new(
        "scene_draft",
        "You write {{genre}} in {{pov_mode}}.",
        "Plan: {{plan}}\nState: {{state}}",
    )
    .with_values(
        RenderContext::new()
            .with("genre", "dark fantasy")
            .with("pov_mode", "third_limited")
            .with("plan", plan)
            .with("state", json!({"stamina": 20})),
    )
}

/// Helper: parsed JSONL records.
fn records(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[test]
fn scene_runs_end_to_end() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new("anthropic").respond(scene_response(
        "Mara climbed the tower stairs, counting each step.",
        &json!({"set": {"location": "tower_base"}, "delta": {"stamina": -4, "hp": {"current": -2}}}),
    ));
    let mut pipeline = ScenePipeline::new(PipelineConfig::default(), sample_state())?;

    let outcome = pipeline.run_scene(&request("Reach the tower."), &transport)?;

    assert_eq!(outcome.scene, 1);
    assert_eq!(outcome.prose, "Mara climbed the tower stairs, counting each step.");
    assert!(outcome.issues.is_empty());
    let state = pipeline.state();
    assert_eq!(state.get_str("stamina"), Some(&json!(16)));
    assert_eq!(state.get_str("hp.current"), Some(&json!(12)));
    assert_eq!(state.get_str("hp.max"), Some(&json!(20)));
    assert_eq!(state.get_str("location"), Some(&json!("tower_base")));

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0].content, "You write dark fantasy in third_limited.");
    assert_eq!(calls[0][1].content, "Plan: Reach the tower.\nState: {\"stamina\":20}");

    let prompt = outcome.prompt.expect("run_scene attaches the prompt");
    assert!(!prompt.hashes.has_duplicate_regions());
    assert_eq!(prompt.budget.step, "scene_draft");
    Ok(())
}

#[test]
fn transport_failure_keeps_state() {
    let transport = ScriptedTransport::new("anthropic").fail(TransportError::Provider {
        status: 503,
        message: "overloaded".to_string(),
    });
    let mut pipeline = ScenePipeline::new(PipelineConfig::default(), sample_state()).unwrap();

    let err = pipeline.run_scene(&request("Wait."), &transport).unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(pipeline.state(), &sample_state());

    let err = pipeline.run_scene(&request("Wait."), &transport).unwrap_err();
    assert!(matches!(err, QuireError::Transport(TransportError::Exhausted)));
}

#[test]
fn merge_conflict_is_all_or_nothing() {
    // `location` is a string, so the nested set cannot descend into it;
    // the stamina delta before it must not leak through.
    let raw = scene_response(
        "Mara rested.",
        &json!({"delta": {"stamina": 5}, "set": {"location.room": "lantern"}}),
    );
    let mut pipeline = ScenePipeline::new(PipelineConfig::default(), sample_state()).unwrap();

    let err = pipeline.commit_scene(&raw, &[] as &[&str]).unwrap_err();
    assert!(matches!(err, QuireError::Merge(_)));
    assert_eq!(pipeline.state(), &sample_state());
}

#[test]
fn strict_mode_blocks_future_milestone() {
    let raw = scene_response(
        "By nightfall Mara had acquired the maps from the archive.",
        &json!({"set": {"inventory.maps": 1}}),
    );
    let config = PipelineConfig::default().with_scan_mode(ScanMode::Strict);
    let mut pipeline = ScenePipeline::new(config, sample_state()).unwrap();

    let err = pipeline
        .commit_scene(&raw, &["milestone: maps_acquired = NOT_YET"])
        .unwrap_err();
    let QuireError::ScanBlocked { issues } = err else {
        panic!("expected a blocked scan");
    };
    assert_eq!(issues[0].code, IssueCode::MilestoneFuture);
    assert_eq!(pipeline.state().get_str("inventory.maps"), None);
}

#[test]
fn regression_between_scenes_is_reported() {
    let mut pipeline = ScenePipeline::new(PipelineConfig::default(), sample_state()).unwrap();
    let raw = scene_response("The wind rose over the gate.", &json!({}));

    let first = pipeline
        .commit_scene(&raw, &["milestone: shard_bind = DONE"])
        .unwrap();
    assert!(first.issues.is_empty());

    let second = pipeline
        .commit_scene(&raw, &["milestone: shard_bind = NOT_YET"])
        .unwrap();
    assert_eq!(second.scene, 2);
    assert_eq!(second.issues.len(), 1);
    assert_eq!(second.issues[0].code, IssueCode::Contradiction);
}

#[test]
fn run_log_records_commits_and_blocks() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("runs/book-1.jsonl");
    let config = PipelineConfig::default().with_scan_mode(ScanMode::Strict);
    {
        let mut pipeline = ScenePipeline::new(config, sample_state())
            .unwrap()
            .with_run_log(RunLog::create(&log_path).unwrap());

        let clean = scene_response("Mara lit the lantern.", &json!({"delta": {"stamina": 1}}));
        pipeline.commit_scene(&clean, &[] as &[&str]).unwrap();

        let drifting = scene_response("I lit the lantern.", &json!({}));
        assert!(pipeline.commit_scene(&drifting, &[] as &[&str]).is_err());
    }

    let records = records(&log_path);
    let events: Vec<&str> = records.iter().map(|r| r["event"].as_str().unwrap()).collect();
    assert_eq!(events, vec!["scene_committed", "scene_blocked"]);
    assert_eq!(records[0]["scene"], 1);
    assert_eq!(records[1]["scene"], 2);
    assert_eq!(records[1]["issues"][0]["code"], "pov_drift");
}

#[cfg(target_os = "linux")]
#[test]
fn unwritable_run_log_does_not_undo_a_commit() {
    let mut pipeline = ScenePipeline::new(PipelineConfig::default(), sample_state())
        .unwrap()
        .with_run_log(RunLog::create("/dev/full").unwrap());

    let raw = scene_response("Mara drank from the well.", &json!({"delta": {"stamina": 3}}));
    let outcome = pipeline.commit_scene(&raw, &[] as &[&str]).unwrap();

    assert_eq!(outcome.scene, 1);
    assert_eq!(pipeline.scenes_committed(), 1);
    assert_eq!(pipeline.state().get_str("stamina"), Some(&json!(23)));
}

#[test]
fn limiter_is_shared_across_scenes() {
    let transport = ScriptedTransport::new("local")
        .respond(scene_response("Mara waited.", &json!({})))
        .respond(scene_response("Mara waited longer.", &json!({})));
    let mut pipeline = ScenePipeline::new(PipelineConfig::default(), sample_state()).unwrap();

    pipeline.run_scene(&request("Wait."), &transport).unwrap();
    pipeline.run_scene(&request("Wait more."), &transport).unwrap();

    assert_eq!(pipeline.limiters().len(), 1);
    assert_eq!(transport.remaining(), 0);
    assert_eq!(pipeline.scenes_committed(), 2);
}

#[test]
fn continuity_pack_is_validated() {
    let pipeline = ScenePipeline::new(PipelineConfig::default(), sample_state()).unwrap();
    let pack = pipeline.continuity_pack(&sample_continuity_pack()).unwrap();
    assert_eq!(pack.location, "tower_base");
    assert_eq!(pack.cast_present, vec!["mara", "tomas"]);

    let mut broken = sample_continuity_pack();
    broken["cast_present"] = json!(["mara", 7]);
    let err = pipeline.continuity_pack(&broken).unwrap_err();
    assert!(err.to_string().contains("/cast_present/1"), "{err}");
}
