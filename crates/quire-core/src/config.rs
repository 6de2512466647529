//! Pipeline configuration
//!
//! [`PipelineConfig`] gathers every knob the scene pipeline reads. It loads
//! from TOML or JSON; every field has a default, so a config file only names
//! what it changes.
//!
//! ```toml
//! scan_mode = "strict"
//! pov_mode = "third_limited"
//! enforce_checksums = true
//!
//! [budgets.scene_draft]
//! system = 900
//! payload = 3000
//! total = 3600
//!
//! [rate_limits.anthropic]
//! min_interval_ms = 1200
//! ```

use crate::error::ConfigError;
use crate::telemetry::LogFormat;
use quire_continuity::{MilestonePatterns, NegationPatterns, PovMode, ScanMode};
use quire_prompt::{BudgetTable, StepBudget};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Minimum spacing between calls to one provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Milliseconds between consecutive calls
    pub min_interval_ms: u64,
}

impl RateLimit {
    /// Spacing as a duration
    #[inline]
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

/// Scene pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Per-step token ceilings
    pub budgets: BudgetTable,

    /// What to do with continuity findings
    pub scan_mode: ScanMode,

    /// Narrative point of view
    pub pov_mode: PovMode,

    /// Fail composition when compiled templates drift from the checksum file
    pub enforce_checksums: bool,

    /// Directory holding `registry.json` and template sources
    pub template_dir: PathBuf,

    /// Directory compiled templates are written to
    pub output_dir: PathBuf,

    /// Committed reference checksums
    pub checksum_file: PathBuf,

    /// JSONL run log; no log when absent
    pub run_log: Option<PathBuf>,

    /// Schema the staged state bag must satisfy before commit
    pub state_schema: Option<String>,

    /// Per-provider call spacing
    pub rate_limits: BTreeMap<String, RateLimit>,

    /// Milestone detector word lists
    pub milestone_patterns: MilestonePatterns,

    /// Contradiction detector word lists
    pub negation_patterns: NegationPatterns,

    /// Default log filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Log line format
    pub log_format: LogFormat,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            budgets: BudgetTable::new(),
            scan_mode: ScanMode::Warn,
            pov_mode: PovMode::ThirdLimited,
            enforce_checksums: false,
            template_dir: PathBuf::from("prompts"),
            output_dir: PathBuf::from("build/prompts"),
            checksum_file: PathBuf::from("prompts/checksums.json"),
            run_log: None,
            state_schema: None,
            rate_limits: BTreeMap::new(),
            milestone_patterns: MilestonePatterns::default(),
            negation_patterns: NegationPatterns::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Compact,
        }
    }
}

impl PipelineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    /// Returns error if the TOML is malformed or fails validation
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or fails validation
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.toml` or `.json` file
    ///
    /// # Errors
    /// Returns error on IO failure, unknown extension, or invalid contents
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text)?,
            Some("json") => Self::from_json_str(&text)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        tracing::debug!(path = %path.display(), "loaded pipeline config");
        Ok(config)
    }

    /// Check cross-field consistency
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if compiled output would land in the
    /// source directory
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output_dir == self.template_dir {
            return Err(ConfigError::Invalid(format!(
                "output_dir and template_dir are both '{}'",
                self.output_dir.display()
            )));
        }
        Ok(())
    }

    /// Set budget table
    #[must_use]
    pub fn with_budgets(mut self, budgets: BudgetTable) -> Self {
        self.budgets = budgets;
        self
    }

    /// Set one step's budget
    #[must_use]
    pub fn with_step_budget(mut self, step: impl Into<String>, budget: StepBudget) -> Self {
        self.budgets = self.budgets.with_step(step, budget);
        self
    }

    /// Set scan mode
    #[must_use]
    pub fn with_scan_mode(mut self, mode: ScanMode) -> Self {
        self.scan_mode = mode;
        self
    }

    /// Set POV mode
    #[must_use]
    pub fn with_pov_mode(mut self, mode: PovMode) -> Self {
        self.pov_mode = mode;
        self
    }

    /// Enable or disable checksum enforcement
    #[must_use]
    pub fn with_enforce_checksums(mut self, enforce: bool) -> Self {
        self.enforce_checksums = enforce;
        self
    }

    /// Set template source directory
    #[must_use]
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dir = dir.into();
        self
    }

    /// Set compiled output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set reference checksum file
    #[must_use]
    pub fn with_checksum_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.checksum_file = path.into();
        self
    }

    /// Set run log path
    #[must_use]
    pub fn with_run_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.run_log = Some(path.into());
        self
    }

    /// Require the staged state to satisfy a named schema
    #[must_use]
    pub fn with_state_schema(mut self, schema: impl Into<String>) -> Self {
        self.state_schema = Some(schema.into());
        self
    }

    /// Set spacing for one provider
    #[must_use]
    pub fn with_rate_limit(mut self, provider: impl Into<String>, min_interval: Duration) -> Self {
        let min_interval_ms = u64::try_from(min_interval.as_millis()).unwrap_or(u64::MAX);
        self.rate_limits
            .insert(provider.into(), RateLimit { min_interval_ms });
        self
    }

    /// Set milestone patterns
    #[must_use]
    pub fn with_milestone_patterns(mut self, patterns: MilestonePatterns) -> Self {
        self.milestone_patterns = patterns;
        self
    }

    /// Path of the registry file inside the template directory
    #[must_use]
    pub fn registry_path(&self) -> PathBuf {
        self.template_dir.join("registry.json")
    }
}
