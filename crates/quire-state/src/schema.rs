//! Schema validation
//!
//! The pipeline only depends on the [`SchemaValidator`] contract. The default
//! implementation compiles JSON Schema documents with `jsonschema` and ships
//! built-in schemas for state patches and continuity packs.

use crate::error::SchemaError;
use jsonschema::JSONSchema;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Name of the built-in state patch schema
pub const STATE_PATCH_SCHEMA: &str = "state_patch";

/// Name of the built-in continuity pack schema
pub const CONTINUITY_PACK_SCHEMA: &str = "continuity_pack";

/// Validates JSON documents against named schemas
pub trait SchemaValidator: Send + Sync {
    /// Validate `data` against the schema registered as `schema_name`
    ///
    /// # Errors
    /// Returns [`SchemaError::Invalid`] with a JSON pointer to the first
    /// failing field, or [`SchemaError::UnknownSchema`]
    fn validate(&self, data: &Value, schema_name: &str) -> Result<(), SchemaError>;
}

/// [`SchemaValidator`] backed by compiled JSON Schema documents
pub struct JsonSchemaValidator {
    schemas: BTreeMap<String, JSONSchema>,
}

impl std::fmt::Debug for JsonSchemaValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSchemaValidator")
            .field("schemas", &self.schemas.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl JsonSchemaValidator {
    /// Create validator with no schemas
    #[must_use]
    pub fn empty() -> Self {
        Self {
            schemas: BTreeMap::new(),
        }
    }

    /// Create validator with the built-in schemas
    ///
    /// # Errors
    /// Returns error if a built-in schema fails to compile
    pub fn with_builtin() -> Result<Self, SchemaError> {
        let mut validator = Self::empty();
        validator.register(STATE_PATCH_SCHEMA, &state_patch_schema())?;
        validator.register(CONTINUITY_PACK_SCHEMA, &continuity_pack_schema())?;
        Ok(validator)
    }

    /// Compile and register a schema, replacing any previous one
    ///
    /// # Errors
    /// Returns [`SchemaError::InvalidSchema`] if the document does not compile
    pub fn register(&mut self, name: &str, schema: &Value) -> Result<(), SchemaError> {
        let compiled = JSONSchema::compile(schema).map_err(|e| SchemaError::InvalidSchema {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        self.schemas.insert(name.to_string(), compiled);
        Ok(())
    }

    /// Registered schema names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, data: &Value, schema_name: &str) -> Result<(), SchemaError> {
        let schema = self
            .schemas
            .get(schema_name)
            .ok_or_else(|| SchemaError::UnknownSchema(schema_name.to_string()))?;

        let Err(mut errors) = schema.validate(data) else {
            return Ok(());
        };
        let Some(first) = errors.next() else {
            return Ok(());
        };
        let pointer = first.instance_path.to_string();
        tracing::debug!(schema = schema_name, pointer = %pointer, "schema validation failed");
        Err(SchemaError::Invalid {
            schema: schema_name.to_string(),
            pointer: if pointer.is_empty() { "/".to_string() } else { pointer },
            message: first.to_string(),
        })
    }
}

/// Built-in schema for `{set?, delta?}` patch documents
#[must_use]
pub fn state_patch_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "set": { "type": "object" },
            "delta": { "$ref": "#/definitions/delta" }
        },
        "definitions": {
            "delta": {
                "type": "object",
                "additionalProperties": {
                    "anyOf": [
                        { "type": "number" },
                        { "$ref": "#/definitions/delta" }
                    ]
                }
            }
        }
    })
}

/// Built-in schema for continuity packs
#[must_use]
pub fn continuity_pack_schema() -> Value {
    let strings = json!({ "type": "array", "items": { "type": "string" } });
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": [
            "scene_end_anchor",
            "constraints",
            "open_threads",
            "cast_present",
            "location",
            "next_action"
        ],
        "properties": {
            "scene_end_anchor": { "type": "string" },
            "constraints": strings.clone(),
            "open_threads": strings.clone(),
            "cast_present": strings,
            "location": { "type": "string" },
            "next_action": { "type": "string" }
        }
    })
}
