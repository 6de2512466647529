//! Prompt catalog composition
//!
//! Provides [`CompositionEngine`], which turns registered template sources into
//! the compiled catalog:
//!
//! ```text
//! registry → sources → partial expansion → normalize → placeholder audit
//!          → checksums → (reference check) → CompositionResult → write_to(dir)
//! ```
//!
//! Composition is all-or-nothing. Every failure surfaces before anything is
//! returned or written, so callers never see a partially correct catalog.

use crate::catalog::TemplateCatalog;
use crate::checksum::ChecksumSet;
use crate::error::{CompositionError, UnknownTokens};
use crate::registry::{TemplateRegistry, TemplateSource};
use crate::render::placeholders;
use crate::text;
use once_cell::sync::Lazy;
use quire_hash::ContentHash;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

static PARTIAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{>\s*([A-Za-z0-9_]+)\s*\}\}").expect("partial pattern is valid")
});

/// Extension of compiled template files
pub const COMPILED_EXTENSION: &str = "txt";

/// Outcome of a placeholder audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    /// Every token is known to the schema
    Ok,
    /// At least one token is unknown
    UnknownTokens,
}

/// Placeholder coverage of one compiled template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceholderAudit {
    /// Audit outcome
    pub status: AuditStatus,
    /// Every token referenced, sorted
    pub tokens: Vec<String>,
    /// Tokens unknown to the schema, sorted
    pub unknown_tokens: Vec<String>,
}

impl PlaceholderAudit {
    /// Check if the audit passed
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == AuditStatus::Ok
    }
}

/// One compiled template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    /// Compiled text (LF only, no BOM, trailing newline)
    pub text: String,
    /// Checksum of the compiled text
    pub checksum: ContentHash,
    /// Placeholder audit
    pub audit: PlaceholderAudit,
}

/// Result of a successful composition run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionResult {
    templates: BTreeMap<String, CompiledTemplate>,
    checksums: ChecksumSet,
    fingerprint: String,
}

impl CompositionResult {
    /// Compiled template by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CompiledTemplate> {
        self.templates.get(name)
    }

    /// Compiled text by name
    #[inline]
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(|t| t.text.as_str())
    }

    /// Number of templates
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Iterate compiled templates in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CompiledTemplate)> {
        self.templates.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Per-template audits in name order
    pub fn audits(&self) -> impl Iterator<Item = (&str, &PlaceholderAudit)> {
        self.iter().map(|(n, t)| (n, &t.audit))
    }

    /// Per-template checksums
    #[inline]
    #[must_use]
    pub fn checksums(&self) -> &ChecksumSet {
        &self.checksums
    }

    /// Fingerprint over all checksums
    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Write one `<name>.txt` file per template into `dir`
    ///
    /// Every text is checked against the encoding policy before the first
    /// byte is written. Each file lands via a temporary name and a rename.
    ///
    /// # Errors
    /// - [`CompositionError::Encoding`] if any text holds a BOM or `\r`
    /// - [`CompositionError::FileCount`] if the directory already holds
    ///   compiled files outside the catalog (nothing is written), or ends up
    ///   holding a different number of them than the catalog
    /// - [`CompositionError::Io`] on filesystem failure
    pub fn write_to(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, CompositionError> {
        let dir = dir.as_ref();
        for (name, template) in &self.templates {
            text::check_bytes(template.text.as_bytes()).map_err(|violation| {
                CompositionError::Encoding {
                    template: name.clone(),
                    violation,
                }
            })?;
        }

        std::fs::create_dir_all(dir).map_err(|e| CompositionError::io_error(dir, e))?;

        // Stale compiled files would survive the write and skew the count
        let stale = compiled_names(dir)?
            .iter()
            .filter(|name| !self.templates.contains_key(*name))
            .count();
        if stale > 0 {
            return Err(CompositionError::FileCount {
                expected: self.templates.len(),
                actual: self.templates.len() + stale,
            });
        }

        let mut written = Vec::with_capacity(self.templates.len());
        for (name, template) in &self.templates {
            let target = compiled_path(dir, name);
            let staging = dir.join(format!("{name}.{COMPILED_EXTENSION}.tmp"));
            std::fs::write(&staging, template.text.as_bytes())
                .map_err(|e| CompositionError::io_error(&staging, e))?;
            std::fs::rename(&staging, &target)
                .map_err(|e| CompositionError::io_error(&target, e))?;
            written.push(target);
        }

        let on_disk = compiled_names(dir)?.len();
        if on_disk != self.templates.len() {
            return Err(CompositionError::FileCount {
                expected: self.templates.len(),
                actual: on_disk,
            });
        }

        tracing::info!(
            dir = %dir.display(),
            templates = written.len(),
            fingerprint = %self.fingerprint,
            "wrote compiled templates"
        );
        Ok(written)
    }
}

/// Path of a compiled template inside an output directory
#[must_use]
pub fn compiled_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{COMPILED_EXTENSION}"))
}

/// Template names of the compiled files already in `dir`
fn compiled_names(dir: &Path) -> Result<Vec<String>, CompositionError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CompositionError::io_error(dir, e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CompositionError::io_error(dir, e))?;
        let path = entry.path();
        let compiled = path.is_file() && path.extension().is_some_and(|ext| ext == COMPILED_EXTENSION);
        if let Some(stem) = path.file_stem().filter(|_| compiled) {
            names.push(stem.to_string_lossy().into_owned());
        }
    }
    Ok(names)
}

/// Checksums of the compiled files a catalog expects in `dir`
///
/// Hashes the raw bytes on disk, so it also catches encoding drift
/// introduced after composition.
///
/// # Errors
/// Returns error if a file is missing or violates the encoding policy
pub fn checksums_on_disk(
    dir: impl AsRef<Path>,
    catalog: &TemplateCatalog,
) -> Result<ChecksumSet, CompositionError> {
    let dir = dir.as_ref();
    let mut set = ChecksumSet::new();
    for name in catalog.names() {
        let path = compiled_path(dir, name);
        let bytes = std::fs::read(&path).map_err(|e| CompositionError::io_error(&path, e))?;
        text::check_bytes(&bytes).map_err(|violation| CompositionError::Encoding {
            template: name.to_string(),
            violation,
        })?;
        set.insert(name, ContentHash::compute(&bytes));
    }
    Ok(set)
}

/// Composes the closed template catalog from registered sources
#[derive(Debug, Clone)]
pub struct CompositionEngine<S> {
    catalog: TemplateCatalog,
    registry: TemplateRegistry,
    source: S,
    reference: Option<ChecksumSet>,
}

impl<S: TemplateSource> CompositionEngine<S> {
    /// Create engine
    #[must_use]
    pub fn new(catalog: TemplateCatalog, registry: TemplateRegistry, source: S) -> Self {
        Self {
            catalog,
            registry,
            source,
            reference: None,
        }
    }

    /// Enforce committed reference checksums on every compose
    #[must_use]
    pub fn with_reference_checksums(mut self, reference: ChecksumSet) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Catalog being composed
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    /// Compose every catalog template
    ///
    /// # Errors
    /// - [`CompositionError::CatalogMismatch`] if the registry does not list
    ///   exactly the catalog's templates
    /// - [`CompositionError::UnknownTokens`] if any audit finds unknown tokens
    /// - [`CompositionError::ChecksumDrift`] if reference checksums are
    ///   enforced and any template differs
    /// - source, partial and placeholder errors as they occur
    pub fn compose(&self) -> Result<CompositionResult, CompositionError> {
        self.check_catalog()?;

        let mut templates = BTreeMap::new();
        let mut offenders = Vec::new();

        for (name, schema) in self.catalog.iter() {
            let text = self.compile(name)?;
            let tokens = placeholders(&text).map_err(|source| CompositionError::Render {
                template: name.to_string(),
                source,
            })?;
            let unknown_tokens: Vec<String> =
                tokens.iter().filter(|t| !schema.knows(t)).cloned().collect();
            let status = if unknown_tokens.is_empty() {
                AuditStatus::Ok
            } else {
                offenders.push(UnknownTokens {
                    template: name.to_string(),
                    tokens: unknown_tokens.clone(),
                });
                AuditStatus::UnknownTokens
            };

            let checksum = ContentHash::of_text(&text);
            tracing::debug!(template = name, checksum = %checksum.short(), "compiled template");
            templates.insert(
                name.to_string(),
                CompiledTemplate {
                    text,
                    checksum,
                    audit: PlaceholderAudit {
                        status,
                        tokens: tokens.into_iter().collect(),
                        unknown_tokens,
                    },
                },
            );
        }

        if !offenders.is_empty() {
            return Err(CompositionError::UnknownTokens { offenders });
        }

        let checksums: ChecksumSet = templates
            .iter()
            .map(|(name, t)| (name.clone(), t.checksum))
            .collect();

        if let Some(reference) = &self.reference {
            let drifted = checksums.diff(reference);
            if !drifted.is_empty() {
                return Err(CompositionError::ChecksumDrift { templates: drifted });
            }
        }

        let fingerprint = checksums.fingerprint();
        tracing::info!(
            templates = templates.len(),
            version = self.registry.version(),
            fingerprint = %fingerprint,
            "composition complete"
        );

        Ok(CompositionResult {
            templates,
            checksums,
            fingerprint,
        })
    }

    /// Compose twice and require identical checksums
    ///
    /// With `outputs`, each run is written into its own directory and the
    /// checksums are recomputed from the bytes on disk. The runs happen one
    /// after the other.
    ///
    /// # Errors
    /// - [`CompositionError::NonDeterministic`] naming templates that differ
    /// - any error from [`Self::compose`] or [`CompositionResult::write_to`]
    pub fn validate_determinism(
        &self,
        outputs: Option<(&Path, &Path)>,
    ) -> Result<ChecksumSet, CompositionError> {
        let first = self.compose()?;
        let second = self.compose()?;

        let (a, b) = match outputs {
            Some((dir_a, dir_b)) => {
                first.write_to(dir_a)?;
                second.write_to(dir_b)?;
                let a = checksums_on_disk(dir_a, &self.catalog)?;
                let b = checksums_on_disk(dir_b, &self.catalog)?;

                let lost_on_write = a.diff(first.checksums());
                if !lost_on_write.is_empty() {
                    return Err(CompositionError::NonDeterministic {
                        templates: lost_on_write,
                    });
                }
                (a, b)
            }
            None => (first.checksums().clone(), second.checksums().clone()),
        };

        let differing = a.diff(&b);
        if !differing.is_empty() {
            tracing::warn!(templates = ?differing, "composition runs disagree");
            return Err(CompositionError::NonDeterministic {
                templates: differing,
            });
        }
        Ok(a)
    }

    fn check_catalog(&self) -> Result<(), CompositionError> {
        let registered = self.registry.templates();
        let missing: Vec<String> = self
            .catalog
            .names()
            .filter(|n| !registered.contains_key(*n))
            .map(str::to_string)
            .collect();
        let unexpected: Vec<String> = registered
            .keys()
            .filter(|n| !self.catalog.contains(n))
            .cloned()
            .collect();
        if missing.is_empty() && unexpected.is_empty() {
            Ok(())
        } else {
            Err(CompositionError::CatalogMismatch {
                missing,
                unexpected,
            })
        }
    }

    fn compile(&self, name: &str) -> Result<String, CompositionError> {
        let Some(path) = self.registry.template_path(name) else {
            return Err(CompositionError::CatalogMismatch {
                missing: vec![name.to_string()],
                unexpected: Vec::new(),
            });
        };
        let raw = self.read(name, path)?;
        let mut stack = vec![name.to_string()];
        let mut text = self.expand_partials(name, &raw, &mut stack)?;
        if !text.ends_with('\n') {
            text.push('\n');
        }
        Ok(text)
    }

    fn read(&self, template: &str, path: &Path) -> Result<String, CompositionError> {
        let raw = self
            .source
            .read(path)
            .map_err(|source| CompositionError::Source {
                template: template.to_string(),
                path: path.to_path_buf(),
                source,
            })?;
        Ok(text::normalize(&raw))
    }

    fn expand_partials(
        &self,
        template: &str,
        body: &str,
        stack: &mut Vec<String>,
    ) -> Result<String, CompositionError> {
        let mut out = String::with_capacity(body.len());
        let mut last = 0;

        for caps in PARTIAL.captures_iter(body) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let partial = &caps[1];
            if stack.iter().any(|s| s == partial) {
                let mut chain = stack.clone();
                chain.push(partial.to_string());
                return Err(CompositionError::PartialCycle { chain });
            }
            let path = self.registry.partial_path(partial).ok_or_else(|| {
                CompositionError::MissingPartial {
                    template: template.to_string(),
                    partial: partial.to_string(),
                }
            })?;
            let raw = self.read(template, path)?;

            stack.push(partial.to_string());
            let expanded = self.expand_partials(template, &raw, stack)?;
            stack.pop();

            out.push_str(&body[last..whole.start()]);
            out.push_str(expanded.strip_suffix('\n').unwrap_or(&expanded));
            last = whole.end();
        }
        out.push_str(&body[last..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateSchema;
    use crate::registry::MemorySource;
    use pretty_assertions::assert_eq;

    fn small_catalog() -> TemplateCatalog {
        TemplateCatalog::new([
            ("draft", TemplateSchema::new(["scene_plan", "state"])),
            ("summary", TemplateSchema::new(["prose"])),
        ])
    }

    fn registry(partials: &[(&str, &str)]) -> TemplateRegistry {
        TemplateRegistry::new(
            "1",
            [("draft", "draft.md"), ("summary", "summary.md")]
                .into_iter()
                .map(|(n, p)| (n.to_string(), p.to_string()))
                .collect(),
            partials
                .iter()
                .map(|(n, p)| ((*n).to_string(), (*p).to_string()))
                .collect(),
        )
        .unwrap()
    }

    fn source() -> MemorySource {
        MemorySource::new()
            .with_file("draft.md", "{{> style}}\r\nPlan: {{scene_plan}}\r\nState: {{state.hp}}")
            .with_file("summary.md", "\u{feff}Summarise:\n{{ prose }}\n")
            .with_file("style.md", "Write in past tense.\n")
    }

    fn engine() -> CompositionEngine<MemorySource> {
        CompositionEngine::new(small_catalog(), registry(&[("style", "style.md")]), source())
    }

    #[test]
    fn composes_with_partials_and_normalization() {
        let result = engine().compose().unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(
            result.text("draft").unwrap(),
            "Write in past tense.\nPlan: {{scene_plan}}\nState: {{state.hp}}\n"
        );
        assert_eq!(result.text("summary").unwrap(), "Summarise:\n{{ prose }}\n");
        for (_, audit) in result.audits() {
            assert!(audit.is_ok());
        }
        assert_eq!(
            result.get("draft").unwrap().audit.tokens,
            vec!["scene_plan".to_string(), "state.hp".to_string()]
        );
    }

    #[test]
    fn unknown_token_fails_whole_composition() {
        let source = source().with_file("summary.md", "{{prose}} {{villain}}");
        let engine =
            CompositionEngine::new(small_catalog(), registry(&[("style", "style.md")]), source);
        match engine.compose() {
            Err(CompositionError::UnknownTokens { offenders }) => {
                assert_eq!(offenders.len(), 1);
                assert_eq!(offenders[0].template, "summary");
                assert_eq!(offenders[0].tokens, vec!["villain".to_string()]);
            }
            other => panic!("expected unknown tokens, got {other:?}"),
        }
    }

    #[test]
    fn registry_must_match_catalog() {
        let registry = TemplateRegistry::new(
            "1",
            [("draft", "draft.md"), ("extra", "x.md")]
                .into_iter()
                .map(|(n, p)| (n.to_string(), p.to_string()))
                .collect(),
            BTreeMap::new(),
        )
        .unwrap();
        let engine = CompositionEngine::new(small_catalog(), registry, source());
        match engine.compose() {
            Err(CompositionError::CatalogMismatch {
                missing,
                unexpected,
            }) => {
                assert_eq!(missing, vec!["summary".to_string()]);
                assert_eq!(unexpected, vec!["extra".to_string()]);
            }
            other => panic!("expected catalog mismatch, got {other:?}"),
        }
    }

    #[test]
    fn missing_partial_is_error() {
        let engine = CompositionEngine::new(small_catalog(), registry(&[]), source());
        assert!(matches!(
            engine.compose(),
            Err(CompositionError::MissingPartial { ref partial, .. }) if partial == "style"
        ));
    }

    #[test]
    fn partial_cycle_is_error() {
        let source = source()
            .with_file("style.md", "{{> tone}}")
            .with_file("tone.md", "{{> style}}");
        let engine = CompositionEngine::new(
            small_catalog(),
            registry(&[("style", "style.md"), ("tone", "tone.md")]),
            source,
        );
        match engine.compose() {
            Err(CompositionError::PartialCycle { chain }) => {
                assert_eq!(chain, vec!["draft", "style", "tone", "style"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn checksum_enforcement_catches_drift() {
        let reference = engine().compose().unwrap().checksums().clone();
        assert!(engine()
            .with_reference_checksums(reference.clone())
            .compose()
            .is_ok());

        let drifted = source().with_file("summary.md", "Summarise briefly:\n{{prose}}\n");
        let engine = CompositionEngine::new(
            small_catalog(),
            registry(&[("style", "style.md")]),
            drifted,
        )
        .with_reference_checksums(reference);
        match engine.compose() {
            Err(CompositionError::ChecksumDrift { templates }) => {
                assert_eq!(templates, vec!["summary".to_string()]);
            }
            other => panic!("expected drift, got {other:?}"),
        }
    }

    #[test]
    fn determinism_in_memory() {
        let checksums = engine().validate_determinism(None).unwrap();
        assert_eq!(checksums.len(), 2);
    }

    #[test]
    fn write_to_produces_clean_files() {
        let dir = tempfile::tempdir().unwrap();
        let result = engine().compose().unwrap();
        let written = result.write_to(dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        for path in written {
            let bytes = std::fs::read(&path).unwrap();
            assert!(!bytes.contains(&b'\r'));
            assert!(!bytes.starts_with(&[0xEF, 0xBB, 0xBF]));
        }
        assert_eq!(
            checksums_on_disk(dir.path(), &small_catalog()).unwrap(),
            *result.checksums()
        );
    }

    #[test]
    fn stale_files_fail_the_count() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.txt"), "stale\n").unwrap();
        let result = engine().compose().unwrap();
        assert!(matches!(
            result.write_to(dir.path()),
            Err(CompositionError::FileCount {
                expected: 2,
                actual: 3
            })
        ));

        let mut left: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        left.sort();
        assert_eq!(left, vec![std::ffi::OsString::from("old.txt")]);
    }

    #[test]
    fn rewriting_the_same_catalog_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let result = engine().compose().unwrap();
        result.write_to(dir.path()).unwrap();
        assert_eq!(result.write_to(dir.path()).unwrap().len(), 2);
    }
}
