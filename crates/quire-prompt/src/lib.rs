//! Quire Prompt System
//!
//! Deterministic prompt rendering, token budgeting and template composition.
//!
//! # Core Concepts
//!
//! - [`render`]: `{{name}}` substitution with canonical JSON for structured values
//! - [`evaluate_budget`]: length-based token estimates against per-step ceilings
//! - [`TemplateRegistry`]: versioned map of template names to source paths
//! - [`TemplateCatalog`]: the closed set of templates and their allowed tokens
//! - [`CompositionEngine`]: compiles, audits and checksums the catalog
//!
//! # Example
//!
//! ```rust,ignore
//! use quire_prompt::{CompositionEngine, DirSource, TemplateCatalog, TemplateRegistry};
//!
//! let registry = TemplateRegistry::load("prompts/registry.json")?;
//! let engine = CompositionEngine::new(
//!     TemplateCatalog::reference(),
//!     registry,
//!     DirSource::new("prompts"),
//! );
//!
//! let checksums = engine.validate_determinism(None)?;
//! engine.compose()?.write_to("build/prompts")?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod budget;
mod catalog;
mod checksum;
mod compose;
mod error;
mod registry;
pub mod render;
pub mod text;

// Re-exports
pub use budget::{
    estimate_tokens, evaluate_budget, BudgetReport, BudgetTable, SectionReport, StepBudget,
};
pub use catalog::{TemplateCatalog, TemplateSchema};
pub use checksum::ChecksumSet;
pub use compose::{
    checksums_on_disk, compiled_path, AuditStatus, CompiledTemplate, CompositionEngine,
    CompositionResult, PlaceholderAudit,
};
pub use error::{CompositionError, RegistryError, RenderError, UnknownTokens};
pub use registry::{DirSource, MemorySource, TemplateRegistry, TemplateSource};
pub use render::{canonical_json, placeholders, render, RenderContext};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::Value;

    proptest! {
        #[test]
        fn estimate_matches_ceiling_law(text in ".{0,200}") {
            let chars = text.chars().count();
            let expected = if chars == 0 { 0 } else { chars.div_ceil(4).max(1) };
            prop_assert_eq!(estimate_tokens(&text), expected);
        }

        #[test]
        fn render_ignores_insertion_order(
            entries in proptest::collection::btree_map("[a-z]{1,6}", "[ -~]{0,12}", 1..6),
        ) {
            let template: String = entries
                .keys()
                .map(|k| format!("<{{{{{k}}}}}>"))
                .collect();
            let forward: RenderContext = entries
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            let reversed: RenderContext = entries
                .iter()
                .rev()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            prop_assert_eq!(
                render(&template, &forward).unwrap(),
                render(&template, &reversed).unwrap()
            );
        }
    }
}
