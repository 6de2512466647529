//! Error types for the state layer
//!
//! Provides error handling for:
//! - Patch ingress (shape and path validation)
//! - Merge (type conflicts in the bag)
//! - Continuity packs (missing or mistyped fields)
//! - Schema validation and response parsing

use crate::path::PathError;

/// Errors while normalizing a raw state patch
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// Patch document is not a JSON object
    #[error("state patch must be a JSON object")]
    NotAnObject,

    /// `set` or `delta` is not an object
    #[error("state patch field '{0}' must be an object")]
    SectionNotObject(&'static str),

    /// Top-level key other than `set` or `delta`
    #[error("unexpected state patch field '{0}'")]
    UnexpectedField(String),

    /// Key is not a valid state path
    #[error("invalid path '{key}' in state patch: {source}")]
    InvalidPath {
        key: String,
        #[source]
        source: PathError,
    },

    /// Delta leaf is not a number
    #[error("delta at '{path}' must be numeric")]
    NonNumericDelta { path: String },

    /// Nested and dotted delta keys resolve to the same path
    #[error("delta path '{path}' is given more than once")]
    DuplicateDelta { path: String },
}

/// Errors while merging a patch into a bag
///
/// A failed merge leaves the bag untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Delta targets a value that is not a number
    #[error("cannot add delta to non-numeric value at '{path}'")]
    NotNumeric { path: String },

    /// Path walks through a value that is not an object
    #[error("cannot descend into non-object value at '{path}'")]
    NotAnObject { path: String },

    /// Sum is not representable as JSON
    #[error("delta at '{path}' produced a non-finite number")]
    NonFinite { path: String },
}

/// Errors while reading a continuity pack
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContinuityError {
    /// Document is not a JSON object
    #[error("continuity pack must be a JSON object")]
    NotAnObject,

    /// Required field is absent
    #[error("continuity pack is missing required field '{field}'")]
    MissingField { field: &'static str },

    /// Field has the wrong type
    #[error("continuity pack field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// Errors from schema validation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// No schema registered under the name
    #[error("unknown schema '{0}'")]
    UnknownSchema(String),

    /// Schema document itself does not compile
    #[error("schema '{name}' does not compile: {message}")]
    InvalidSchema { name: String, message: String },

    /// Data does not conform
    #[error("{schema} validation failed at '{pointer}': {message}")]
    Invalid {
        schema: String,
        pointer: String,
        message: String,
    },
}

/// Errors while parsing a raw model response
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No patch marker or no JSON after it
    #[error("no state patch JSON found in response")]
    MissingPatch,

    /// Patch JSON is malformed
    #[error("state patch JSON is malformed: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Patch JSON is not an object
    #[error("state patch must be a JSON object")]
    PatchNotObject,
}
