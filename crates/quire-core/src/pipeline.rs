//! Scene pipeline
//!
//! Drives one scene at a time from request to committed state:
//!
//! ```text
//! render -> hash -> budget -> limiter -> transport
//!        -> parse -> schema -> scan gate -> stage/validate/commit -> run log
//! ```
//!
//! The pipeline exclusively owns the canonical [`StateBag`]. A scene either
//! commits completely or leaves the bag as it was.

use crate::config::PipelineConfig;
use crate::error::QuireError;
use crate::limiter::LimiterRegistry;
use crate::run_log::RunLog;
use crate::transport::{Message, ModelTransport};
use quire_continuity::{InvariantScanner, Issue, ScanContext};
use quire_hash::{hash_prompt_parts, PromptHashes};
use quire_prompt::{
    evaluate_budget, render, BudgetReport, ChecksumSet, CompositionEngine, CompositionResult,
    DirSource, RenderContext, TemplateCatalog, TemplateRegistry,
};
use quire_state::schema::{CONTINUITY_PACK_SCHEMA, STATE_PATCH_SCHEMA};
use quire_state::{
    parse_response, ContinuityPack, JsonSchemaValidator, SchemaValidator, StateBag, StateCommit,
    StatePath,
};
use serde_json::{json, Value};

/// Budget segment name for the rendered system prompt
pub const SYSTEM_SEGMENT: &str = "system";

/// Budget segment name for the rendered user payload
pub const PAYLOAD_SEGMENT: &str = "payload";

/// Everything needed to generate one scene
#[derive(Debug, Clone)]
pub struct SceneRequest {
    /// Budget step (and default limiter phase)
    pub step: String,

    /// Limiter phase
    pub phase: String,

    /// Stable system template
    pub system_template: String,

    /// Per-scene payload template
    pub payload_template: String,

    /// Placeholder values for both templates
    pub values: RenderContext,

    /// Invariants declared for this scene
    pub invariants: Vec<String>,

    /// Response length cap
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

impl SceneRequest {
    /// Create request for a budget step
    #[must_use]
    pub fn new(
        step: impl Into<String>,
        system_template: impl Into<String>,
        payload_template: impl Into<String>,
    ) -> Self {
        let step = step.into();
        Self {
            phase: step.clone(),
            step,
            system_template: system_template.into(),
            payload_template: payload_template.into(),
            values: RenderContext::new(),
            invariants: Vec::new(),
            max_tokens: 4096,
            temperature: 0.8,
        }
    }

    /// With placeholder values
    #[must_use]
    pub fn with_values(mut self, values: RenderContext) -> Self {
        self.values = values;
        self
    }

    /// With declared invariants
    #[must_use]
    pub fn with_invariants<S: AsRef<str>>(mut self, invariants: &[S]) -> Self {
        self.invariants = invariants.iter().map(|s| s.as_ref().to_string()).collect();
        self
    }

    /// With limiter phase
    #[must_use]
    pub fn with_phase(mut self, phase: impl Into<String>) -> Self {
        self.phase = phase.into();
        self
    }

    /// With sampling settings
    #[must_use]
    pub fn with_sampling(mut self, max_tokens: u32, temperature: f32) -> Self {
        self.max_tokens = max_tokens;
        self.temperature = temperature;
        self
    }
}

/// Rendered, measured prompt for one scene
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPrompt {
    /// Rendered system template
    pub system: String,

    /// Rendered payload template
    pub payload: String,

    /// Per-region digests
    pub hashes: PromptHashes,

    /// Budget measurement
    pub budget: BudgetReport,
}

impl PreparedPrompt {
    /// System and payload joined the way the transport receives them
    #[must_use]
    pub fn assembled(&self) -> String {
        assemble(&self.system, &self.payload)
    }

    /// Conversation for the transport
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        vec![
            Message::system(self.system.clone()),
            Message::user(self.payload.clone()),
        ]
    }
}

fn assemble(system: &str, payload: &str) -> String {
    format!("{system}\n\n{payload}")
}

/// Result of a committed scene
#[derive(Debug, Clone, PartialEq)]
pub struct SceneOutcome {
    /// One-based scene number
    pub scene: u64,

    /// Scene prose
    pub prose: String,

    /// Advisory findings that did not block the commit
    pub issues: Vec<Issue>,

    /// Delta paths dropped because a `set` covered them
    pub shadowed_deltas: Vec<StatePath>,

    /// Prompt that produced the scene, when the pipeline rendered it
    pub prompt: Option<PreparedPrompt>,
}

/// Single-book scene pipeline
pub struct ScenePipeline {
    config: PipelineConfig,
    validator: Box<dyn SchemaValidator>,
    scanner: InvariantScanner,
    limiters: LimiterRegistry,
    run_log: Option<RunLog>,
    state: StateBag,
    prior_invariants: Vec<String>,
    scenes: u64,
}

impl std::fmt::Debug for ScenePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenePipeline")
            .field("config", &self.config)
            .field("scanner", &self.scanner)
            .field("limiters", &self.limiters)
            .field("run_log", &self.run_log)
            .field("scenes", &self.scenes)
            .finish_non_exhaustive()
    }
}

impl ScenePipeline {
    /// Create pipeline over an initial state
    ///
    /// Uses the built-in schemas and a scanner tuned by the config's
    /// pattern lists. The run log is opened when the config names one.
    ///
    /// # Errors
    /// Returns error if a built-in schema fails to compile or the run log
    /// cannot be opened
    pub fn new(config: PipelineConfig, state: StateBag) -> Result<Self, QuireError> {
        let validator = JsonSchemaValidator::with_builtin()?;
        let run_log = config.run_log.as_ref().map(RunLog::create).transpose()?;
        Ok(Self {
            scanner: InvariantScanner::with_patterns(
                config.milestone_patterns.clone(),
                config.negation_patterns.clone(),
            ),
            limiters: LimiterRegistry::from_config(&config),
            validator: Box::new(validator),
            run_log,
            state,
            prior_invariants: Vec::new(),
            scenes: 0,
            config,
        })
    }

    /// Replace the schema validator
    #[must_use]
    pub fn with_validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Replace the rule scanner
    #[must_use]
    pub fn with_scanner(mut self, scanner: InvariantScanner) -> Self {
        self.scanner = scanner;
        self
    }

    /// Attach a run log handle
    #[must_use]
    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Canonical state
    #[inline]
    #[must_use]
    pub fn state(&self) -> &StateBag {
        &self.state
    }

    /// Number of committed scenes
    #[inline]
    #[must_use]
    pub fn scenes_committed(&self) -> u64 {
        self.scenes
    }

    /// Shared limiter cache
    #[inline]
    #[must_use]
    pub fn limiters(&self) -> &LimiterRegistry {
        &self.limiters
    }

    /// Take the canonical state, consuming the pipeline
    #[must_use]
    pub fn into_state(self) -> StateBag {
        self.state
    }

    /// Render, hash and measure a request
    ///
    /// # Errors
    /// - [`QuireError::Render`] on an unresolved placeholder
    /// - [`QuireError::OverBudget`] if any ceiling for the step is exceeded
    pub fn prepare(&self, request: &SceneRequest) -> Result<PreparedPrompt, QuireError> {
        let system = render(&request.system_template, &request.values)?;
        let payload = render(&request.payload_template, &request.values)?;
        let hashes = hash_prompt_parts(&system, &payload, &assemble(&system, &payload));
        if hashes.has_duplicate_regions() {
            tracing::warn!(step = %request.step, "prompt regions hash identically");
        }

        let budget = evaluate_budget(
            &request.step,
            [
                (SYSTEM_SEGMENT, system.as_str()),
                (PAYLOAD_SEGMENT, payload.as_str()),
            ],
            &self.config.budgets,
        );
        if budget.over_budget {
            return Err(QuireError::OverBudget {
                report: Box::new(budget),
            });
        }
        tracing::debug!(
            step = %request.step,
            tokens = budget.total_tokens,
            prefix = %hashes.stable_prefix.short(),
            "prompt prepared"
        );

        Ok(PreparedPrompt {
            system,
            payload,
            hashes,
            budget,
        })
    }

    /// Generate and commit one scene
    ///
    /// # Errors
    /// Any error from [`Self::prepare`], the transport, or [`Self::commit_scene`].
    /// The state is unchanged on error.
    pub fn run_scene(
        &mut self,
        request: &SceneRequest,
        transport: &dyn ModelTransport,
    ) -> Result<SceneOutcome, QuireError> {
        let prompt = self.prepare(request)?;

        let waited = self
            .limiters
            .get(transport.provider(), &request.phase)
            .acquire();
        if !waited.is_zero() {
            tracing::debug!(provider = transport.provider(), ?waited, "rate limited");
        }

        let raw = transport.complete(&prompt.messages(), request.max_tokens, request.temperature)?;
        self.record(
            "response_received",
            json!({
                "step": request.step,
                "provider": transport.provider(),
                "assembled_prompt": prompt.hashes.assembled_prompt,
                "prompt_tokens": prompt.budget.total_tokens,
                "response_chars": raw.chars().count(),
            }),
        )?;

        let mut outcome = self.commit_scene(&raw, &request.invariants)?;
        outcome.prompt = Some(prompt);
        Ok(outcome)
    }

    /// Parse, validate, scan and commit a raw model response
    ///
    /// # Errors
    /// - [`QuireError::Parse`] / [`QuireError::Schema`] / [`QuireError::Patch`]
    ///   for malformed responses
    /// - [`QuireError::ScanBlocked`] in strict mode when the scan finds issues
    /// - [`QuireError::Merge`] if the patch conflicts with the state's shape
    /// - [`QuireError::Schema`] if the staged state fails `state_schema`
    ///
    /// Once the state is committed the call succeeds. A `scene_committed`
    /// record the run log cannot write is reported through `tracing` only.
    pub fn commit_scene<S: AsRef<str>>(
        &mut self,
        raw: &str,
        invariants: &[S],
    ) -> Result<SceneOutcome, QuireError> {
        let parsed = parse_response(raw)?;
        self.validator.validate(&parsed.patch, STATE_PATCH_SCHEMA)?;
        let patch = parsed.state_patch()?;

        let ctx = ScanContext::new(&parsed.prose)
            .with_proposed_update(&parsed.patch)
            .with_invariants(invariants)
            .with_prior_invariants(&self.prior_invariants)
            .with_pov_mode(self.config.pov_mode);
        let scan = self.scanner.gate(&ctx, self.config.scan_mode);
        if scan.blocked {
            self.record(
                "scene_blocked",
                json!({ "scene": self.scenes + 1, "issues": scan.issues }),
            )?;
            return Err(QuireError::ScanBlocked {
                issues: scan.issues,
            });
        }

        let mut commit = StateCommit::stage(&self.state, &patch)?;
        let validator = &self.validator;
        let state_schema = self.config.state_schema.as_deref();
        commit.validate(|staged| match state_schema {
            Some(name) => validator.validate(&staged.to_value(), name),
            None => Ok(()),
        })?;
        let committed = commit.commit_into(&mut self.state);
        debug_assert!(committed);

        self.scenes += 1;
        self.prior_invariants = invariants.iter().map(|s| s.as_ref().to_string()).collect();
        tracing::info!(
            scene = self.scenes,
            ops = patch.len(),
            issues = scan.issues.len(),
            "scene committed"
        );
        // The state has moved on; a lost log line must not read as a failed scene
        if let Err(e) = self.record(
            "scene_committed",
            json!({
                "scene": self.scenes,
                "ops": patch.len(),
                "shadowed": patch.shadowed_deltas().iter().map(ToString::to_string).collect::<Vec<_>>(),
                "issues": scan.issues,
            }),
        ) {
            tracing::warn!(scene = self.scenes, error = %e, "run log record failed after commit");
        }

        Ok(SceneOutcome {
            scene: self.scenes,
            prose: parsed.prose,
            issues: scan.issues,
            shadowed_deltas: patch.shadowed_deltas().to_vec(),
            prompt: None,
        })
    }

    /// Validate and read an end-of-scene continuity pack
    ///
    /// # Errors
    /// Returns [`QuireError::Schema`] or [`QuireError::Pack`] naming the first
    /// bad field
    pub fn continuity_pack(&self, value: &Value) -> Result<ContinuityPack, QuireError> {
        self.validator.validate(value, CONTINUITY_PACK_SCHEMA)?;
        Ok(ContinuityPack::from_value(value)?)
    }

    fn record(&self, event: &str, fields: Value) -> Result<(), QuireError> {
        if let Some(log) = &self.run_log {
            log.record(event, fields)?;
        }
        Ok(())
    }
}

/// Compose, certify and write the prompt catalog described by a config
///
/// Loads `registry.json` from the template directory, composes the reference
/// catalog twice to prove determinism, enforces the committed checksums when
/// configured, and writes the compiled files to the output directory.
///
/// # Errors
/// Any registry, composition or checksum error; nothing is written unless
/// every check passed
pub fn build_prompt_catalog(config: &PipelineConfig) -> Result<CompositionResult, QuireError> {
    build_catalog(config, TemplateCatalog::reference())
}

/// [`build_prompt_catalog`] for an explicit catalog
///
/// # Errors
/// Same as [`build_prompt_catalog`]
pub fn build_catalog(
    config: &PipelineConfig,
    catalog: TemplateCatalog,
) -> Result<CompositionResult, QuireError> {
    config.validate()?;
    let registry = TemplateRegistry::load(config.registry_path())?;
    let mut engine = CompositionEngine::new(catalog, registry, DirSource::new(&config.template_dir));
    if config.enforce_checksums {
        engine = engine.with_reference_checksums(ChecksumSet::load(&config.checksum_file)?);
    }

    let checksums = engine.validate_determinism(None)?;
    let result = engine.compose()?;
    let written = result.write_to(&config.output_dir)?;
    tracing::info!(
        templates = written.len(),
        fingerprint = %result.fingerprint(),
        checksums = checksums.len(),
        output = %config.output_dir.display(),
        "prompt catalog built"
    );
    Ok(result)
}
