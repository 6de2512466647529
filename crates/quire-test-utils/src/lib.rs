//! Testing utilities for the Quire workspace
//!
//! Shared fixtures: a scripted transport, sample state and responses, and an
//! on-disk template tree for the reference catalog.

#![allow(missing_docs)]

use parking_lot::Mutex;
use quire_core::{Message, ModelTransport, TransportError};
use quire_prompt::{TemplateCatalog, TemplateRegistry};
use quire_state::StateBag;
use serde_json::{json, Value};
use std::collections::{BTreeMap, VecDeque};
use std::path::Path;

/// Transport that replays canned responses in order
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    provider: String,
    responses: Mutex<VecDeque<Result<String, TransportError>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedTransport {
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn respond(self, text: impl Into<String>) -> Self {
        self.responses.lock().push_back(Ok(text.into()));
        self
    }

    #[must_use]
    pub fn fail(self, error: TransportError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    /// Conversations received so far
    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

impl ModelTransport for ScriptedTransport {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn complete(
        &self,
        messages: &[Message],
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, TransportError> {
        self.calls.lock().push(messages.to_vec());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or(Err(TransportError::Exhausted))
    }
}

pub fn sample_state() -> StateBag {
    StateBag::from_value(json!({
        "stamina": 20,
        "hp": { "current": 14, "max": 20 },
        "inventory": { "rope": 1 },
        "location": "north_gate"
    }))
    .unwrap()
}

/// Build a response in the `PROSE:` / `STATE_PATCH:` layout
pub fn scene_response(prose: &str, patch: &Value) -> String {
    format!("PROSE:\n{prose}\n\nSTATE_PATCH:\n```json\n{patch:#}\n```\n")
}

pub fn sample_continuity_pack() -> Value {
    json!({
        "scene_end_anchor": "Mara bars the tower door.",
        "constraints": ["the shard is physical", "Tomas is alive"],
        "open_threads": ["missing_maps"],
        "cast_present": ["mara", "tomas"],
        "location": "tower_base",
        "next_action": "Climb to the lantern room."
    })
}

/// Write one plain LF source per catalog template plus `registry.json`
///
/// Each template lists every allowed token once, so the audit passes.
pub fn write_catalog_sources(root: &Path, catalog: &TemplateCatalog) -> TemplateRegistry {
    std::fs::create_dir_all(root.join("steps")).unwrap();
    let mut templates = BTreeMap::new();
    for (name, schema) in catalog.iter() {
        let mut body = format!("# {name}\n");
        for token in schema.tokens() {
            body.push_str(&format!("{token}: {{{{{token}}}}}\n"));
        }
        let rel = format!("steps/{name}.md");
        std::fs::write(root.join(&rel), body).unwrap();
        templates.insert(name.to_string(), rel);
    }
    let registry = TemplateRegistry::new("1", templates, BTreeMap::new()).unwrap();
    std::fs::write(root.join("registry.json"), registry.to_json_string().unwrap()).unwrap();
    registry
}
