use async_trait::async_trait;

use crate::error::LlmError;

/// One prior turn in a conversation, as the model should see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: &'static str,
    pub text: String,
}

impl ChatTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user",
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            text: text.into(),
        }
    }
}

/// A single completion request: optional system prompt, prior turns, and
/// the sampler settings the caller wants.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub turns: Vec<ChatTurn>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    /// A deterministic request, used for structured extraction.
    pub fn deterministic(system: impl Into<String>, user_text: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            turns: vec![ChatTurn::user(user_text)],
            temperature: 0.0,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Abstraction over a text completion backend.
///
/// Implementations must be cheap to share behind an `Arc` and safe to call
/// concurrently.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Produce the model's next message for the given request.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}
