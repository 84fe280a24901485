//! Core data types shared across the ZendAI workspace.
//!
//! Persisted entities (users, chat sessions, messages) use SQLite rowids
//! as their identifiers. Ticket types are ephemeral: they exist only for
//! the duration of one request and are never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Users
// =============================================================================

/// A full user row, including the password hash.
///
/// Never serialized to API responses; handlers convert to [`UserProfile`]
/// first so the hash cannot leak.
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub apikey: Option<String>,
    pub subdomain: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// The sanitized view of this user.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            apikey: self.apikey.clone(),
            subdomain: self.subdomain.clone(),
            created_at: self.created_at,
        }
    }

    /// Zendesk credentials, if both halves are on file.
    ///
    /// Ticket-backed operations require both; one without the other is
    /// treated the same as neither.
    pub fn zendesk_credentials(&self) -> Option<ZendeskCredentials> {
        match (&self.apikey, &self.subdomain) {
            (Some(token), Some(subdomain)) => Some(ZendeskCredentials {
                token: token.clone(),
                subdomain: subdomain.clone(),
            }),
            _ => None,
        }
    }
}

/// A user as exposed over the API (password hash excluded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub apikey: Option<String>,
    pub subdomain: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Credentials for the ticket backend, resolved from the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZendeskCredentials {
    /// Basic-auth token for the Zendesk API.
    pub token: String,
    /// Zendesk subdomain, e.g. "acme" for acme.zendesk.com.
    pub subdomain: String,
}

// =============================================================================
// Chat sessions and messages
// =============================================================================

/// A persisted chat session owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: i64,
    pub owner_id: i64,
    /// Unset until the first message; then derived once from an LLM
    /// heading summarization and never changed.
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A session annotated with its ordered messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWithMessages {
    #[serde(flatten)]
    pub session: ChatSession,
    pub messages: Vec<Message>,
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(MessageRole::User),
            "assistant" => Some(MessageRole::Assistant),
            _ => None,
        }
    }
}

/// One immutable message in a session. Canonical conversation order is
/// `created_at` ascending, ties broken by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub session_id: i64,
    pub role: MessageRole,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Tickets (ephemeral, never persisted)
// =============================================================================

/// One ticket from the backend's search response, with the fixed field
/// list the pipeline cares about. Anything else upstream sends is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketRecord {
    pub id: i64,
    pub assignee_id: Option<i64>,
    pub subject: String,
    pub description: String,
    pub created_at: String,
    pub status: String,
    pub url: String,
    pub via: serde_json::Value,
}

/// The structured intent extracted from a free-text ticket question.
///
/// Every slot defaults to "not specified"; the extractor never guesses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketRequirement {
    /// The user asked about one specific ticket by id.
    pub ticket_id: Option<i64>,
    /// The user asked about tickets in a named month.
    pub month: Option<String>,
    /// The user asked about tickets handled by a named agent.
    pub agent: Option<String>,
    /// The user asked about one agent's tickets in one month.
    pub agent_and_month: Option<(String, String)>,
}
