use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the ZendAI server.
///
/// Loaded from `~/.zendai/config.toml` by default. Each section covers one
/// concern; every field has a serde default so a partial file is fine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZendaiConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub zendesk: ZendeskConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl ZendaiConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ZendaiConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration, falling back to defaults if the file does not
    /// exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// API server port.
    pub port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.zendai/data".to_string(),
            log_level: "info".to_string(),
            port: 8000,
        }
    }
}

/// Authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing access tokens. Must be overridden in any
    /// real deployment; the default only exists so tests can run.
    pub secret_key: String,
    /// Access token lifetime in minutes.
    pub token_expiry_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: "change-me".to_string(),
            token_expiry_minutes: 30,
        }
    }
}

/// LLM completion backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API key for the completion backend. Empty means unset.
    pub api_key: String,
    /// Base URL of an OpenAI-compatible chat-completions API.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Token budget for the requirement-extraction call.
    pub max_extraction_tokens: u32,
    /// Per-request timeout for completion calls, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            max_extraction_tokens: 256,
            request_timeout_secs: 60,
        }
    }
}

/// Ticket backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZendeskConfig {
    /// Per-request timeout for ticket searches, in seconds.
    pub request_timeout_secs: u64,
    /// Override for the backend base URL. When unset, the URL is derived
    /// from the caller's subdomain (`https://{subdomain}.zendesk.com`).
    /// Tests point this at a local mock server.
    pub base_url: Option<String>,
}

impl Default for ZendeskConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            base_url: None,
        }
    }
}

/// Chat pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// How many prior turns (user + assistant pairs) are replayed into
    /// the responder. 0 disables history replay.
    pub history_turns: usize,
    /// Maximum user message length in characters.
    pub max_message_length: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_turns: 20,
            max_message_length: 2000,
        }
    }
}
