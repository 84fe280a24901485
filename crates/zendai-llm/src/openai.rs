use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use zendai_core::config::LlmConfig;

use crate::error::LlmError;
use crate::provider::{CompletionProvider, CompletionRequest};

/// Client for an OpenAI-compatible chat completions endpoint.
pub struct OpenAiProvider {
    /// Pre-computed `"Bearer <key>"` header value, absent when no key is
    /// configured.
    cached_auth_header: Option<String>,
    base_url: String,
    model: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Self {
        let api_key = config.api_key.trim();
        Self {
            cached_auth_header: if api_key.is_empty() {
                None
            } else {
                Some(format!("Bearer {api_key}"))
            },
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client: Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(request.turns.len() + 1);
        if let Some(system) = &request.system {
            messages.push(WireMessage {
                role: "system",
                content: system.clone(),
            });
        }
        for turn in &request.turns {
            messages.push(WireMessage {
                role: turn.role,
                content: turn.text.clone(),
            });
        }
        ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let auth_header = self
            .cached_auth_header
            .as_ref()
            .ok_or(LlmError::MissingApiKey)?;

        let body = self.build_request(&request);
        debug!(
            model = %body.model,
            turns = body.messages.len(),
            "sending completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", auth_header)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyCompletion);
        }
        Ok(text)
    }
}
