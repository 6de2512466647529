//! Functional tests for building the prompt catalog from configuration.
//!
//! - a config pointing at a template tree yields fourteen clean files
//! - enforced checksums pass for committed sources and fail on drift
//! - a missing registry surfaces as a registry error
//! - config files load from disk before the build

use quire_core::{build_prompt_catalog, PipelineConfig, QuireError};
use quire_prompt::{CompositionError, RegistryError, TemplateCatalog};
use quire_test_utils::write_catalog_sources;
use std::path::Path;

/// Helper: config over a source tree and an output dir under `root`.
fn config(root: &Path) -> PipelineConfig {
    PipelineConfig::new()
        .with_template_dir(root.join("prompts"))
        .with_output_dir(root.join("build"))
        .with_checksum_file(root.join("prompts/checksums.json"))
}

#[test]
fn builds_fourteen_clean_templates() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path());
    write_catalog_sources(&config.template_dir, &TemplateCatalog::reference());

    let result = build_prompt_catalog(&config).unwrap();
    assert_eq!(result.len(), 14);

    let files: Vec<_> = std::fs::read_dir(&config.output_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 14);
    for path in files {
        let bytes = std::fs::read(&path).unwrap();
        assert!(!bytes.contains(&b'\r'));
        assert!(!bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
    }
}

#[test]
fn enforced_checksums_catch_drift() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path()).with_enforce_checksums(true);
    write_catalog_sources(&config.template_dir, &TemplateCatalog::reference());

    let first = build_prompt_catalog(&config.clone().with_enforce_checksums(false)).unwrap();
    first.checksums().save(&config.checksum_file).unwrap();
    assert!(build_prompt_catalog(&config).is_ok());

    let edited = config.template_dir.join("steps/style_pass.md");
    let mut body = std::fs::read_to_string(&edited).unwrap();
    body.push_str("Prefer short sentences.\n");
    std::fs::write(&edited, body).unwrap();

    match build_prompt_catalog(&config) {
        Err(QuireError::Composition(CompositionError::ChecksumDrift { templates })) => {
            assert_eq!(templates, vec!["style_pass".to_string()]);
        }
        other => panic!("expected checksum drift, got {other:?}"),
    }
}

#[test]
fn missing_registry_is_reported() {
    let root = tempfile::tempdir().unwrap();
    let err = build_prompt_catalog(&config(root.path())).unwrap_err();
    assert!(matches!(err, QuireError::Registry(RegistryError::Io { .. })), "{err}");
}

#[test]
fn config_file_drives_the_build() {
    let root = tempfile::tempdir().unwrap();
    let base = config(root.path());
    write_catalog_sources(&base.template_dir, &TemplateCatalog::reference());

    let config_path = root.path().join("quire.toml");
    std::fs::write(
        &config_path,
        format!(
            "template_dir = {:?}\noutput_dir = {:?}\nscan_mode = \"strict\"\n",
            base.template_dir.display().to_string(),
            base.output_dir.display().to_string(),
        ),
    )
    .unwrap();

    let loaded = PipelineConfig::load(&config_path).unwrap();
    assert_eq!(loaded.template_dir, base.template_dir);
    assert_eq!(build_prompt_catalog(&loaded).unwrap().len(), 14);
}
