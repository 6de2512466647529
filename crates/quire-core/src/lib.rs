//! Quire Scene Pipeline
//!
//! Wires the prompt, state and continuity crates into one scene-at-a-time
//! flow, with the ambient pieces a long-running generation job needs.
//!
//! # Core Concepts
//!
//! - [`PipelineConfig`]: budgets, scan and POV modes, directories, provider limits
//! - [`ScenePipeline`]: owns the canonical state and commits scenes all-or-nothing
//! - [`ModelTransport`]: seam to a text-generation provider
//! - [`LimiterRegistry`]: one shared [`RateLimiter`] per `(provider, phase)`
//! - [`RunLog`]: caller-owned JSONL event sink, flushed on drop
//! - [`build_prompt_catalog`]: compose, certify and write the template catalog
//!
//! # Example
//!
//! ```rust,ignore
//! use quire_core::{PipelineConfig, ScenePipeline, SceneRequest};
//!
//! let config = PipelineConfig::load("quire.toml")?;
//! quire_core::telemetry::init_tracing(&config.log_level, config.log_format);
//!
//! let mut pipeline = ScenePipeline::new(config, StateBag::new())?;
//! let outcome = pipeline.run_scene(&request, &transport)?;
//! println!("{}", outcome.prose);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
mod config;
mod error;
mod limiter;
mod pipeline;
mod run_log;
pub mod telemetry;
mod transport;

// Re-exports
pub use config::{PipelineConfig, RateLimit};
pub use error::{ConfigError, QuireError, RunLogError, TransportError};
pub use limiter::{LimiterRegistry, RateLimiter};
pub use pipeline::{
    build_catalog, build_prompt_catalog, PreparedPrompt, SceneOutcome, ScenePipeline,
    SceneRequest, PAYLOAD_SEGMENT, SYSTEM_SEGMENT,
};
pub use run_log::RunLog;
pub use telemetry::{init_tracing, LogFormat};
pub use transport::{Message, ModelTransport, Role};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
