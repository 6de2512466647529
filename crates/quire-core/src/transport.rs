//! Model transport seam
//!
//! The pipeline hands a role-tagged conversation to a [`ModelTransport`] and
//! consumes only the returned text. HTTP clients, retries and provider
//! quirks live behind this trait.

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Speaker of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Standing instructions
    System,
    /// Request content
    User,
    /// Prior model output
    Assistant,
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        })
    }
}

/// One message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Speaker
    pub role: Role,
    /// Text
    pub content: String,
}

impl Message {
    /// System message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// User message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Text-generation provider
pub trait ModelTransport: Send + Sync {
    /// Provider name used for rate limiting and logs
    fn provider(&self) -> &str;

    /// Send a conversation and return the response text
    ///
    /// # Errors
    /// Returns error if the provider cannot produce a response
    fn complete(
        &self,
        messages: &[Message],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_lowercase_role() {
        let json = serde_json::to_string(&Message::system("be brief")).unwrap();
        assert_eq!(json, r#"{"role":"system","content":"be brief"}"#);
    }
}
