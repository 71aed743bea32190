//! Generative text service client.
//!
//! The engine talks to an external chat-style text service for three jobs:
//! interpreting free-form player input into structured intents, producing
//! NPC dialogue and decisions, and narrating mechanical outcomes. All three
//! go through the [`GenerativeClient`] trait so the transport can be swapped:
//! [`ollama::OllamaClient`] speaks the OpenAI-compatible HTTP API, while
//! [`scripted::ScriptedClient`] replays canned replies for offline play and
//! deterministic tests.
//!
//! Every call site must tolerate failure: a dead endpoint, a timeout, or
//! garbage output all degrade to the engine's deterministic fallback paths.

pub mod extract;
pub mod ollama;
pub mod scripted;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use extract::{extract_json_array, extract_json_object};
pub use ollama::OllamaClient;
pub use scripted::ScriptedClient;

/// Errors from the generative service boundary.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Transport-level failure (connection refused, timeout, non-2xx).
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The service answered but the body could not be decoded.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The client is disabled or has no replies left (scripted backend).
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Message roles in a chat-style exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One ordered message in a chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A chat completion request: ordered messages plus sampling knobs.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Port to the generative text service.
///
/// Implementations must be cheap to call concurrently and must never block
/// the caller beyond their configured timeout.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Send a chat request and return the raw text of the first reply.
    async fn chat(&self, request: ChatRequest) -> Result<String, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_constructors_set_roles() {
        assert_eq!(ChatMessage::system("a").role, ChatRole::System);
        assert_eq!(ChatMessage::user("b").role, ChatRole::User);
        assert_eq!(ChatMessage::assistant("c").role, ChatRole::Assistant);
    }

    #[test]
    fn chat_request_builder() {
        let req = ChatRequest::new(vec![ChatMessage::user("hi")])
            .with_temperature(0.7)
            .with_max_tokens(256);
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.temperature, Some(0.7));
        assert_eq!(req.max_tokens, Some(256));
    }
}
