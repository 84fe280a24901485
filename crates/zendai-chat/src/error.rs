use zendai_core::error::ZendaiError;
use zendai_llm::LlmError;
use zendai_zendesk::TicketError;

/// Errors from the chat pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Message exceeds the maximum length of {0} characters")]
    MessageTooLong(usize),

    #[error("Chat session not found")]
    NotFound,

    #[error("Zendesk apikey and subdomain must be configured first")]
    CredentialsMissing,

    #[error(transparent)]
    Tickets(#[from] TicketError),

    #[error("Requirement extraction produced invalid output: {0}")]
    ExtractionParse(String),

    #[error("Response generation failed: {0}")]
    Generation(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        ChatError::Generation(err.to_string())
    }
}

impl From<ZendaiError> for ChatError {
    fn from(err: ZendaiError) -> Self {
        match err {
            ZendaiError::NotFound => ChatError::NotFound,
            ZendaiError::CredentialsMissing => ChatError::CredentialsMissing,
            other => ChatError::Storage(other.to_string()),
        }
    }
}

impl From<ChatError> for ZendaiError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage | ChatError::MessageTooLong(_) => {
                ZendaiError::BadRequest(err.to_string())
            }
            ChatError::NotFound => ZendaiError::NotFound,
            ChatError::CredentialsMissing => ZendaiError::CredentialsMissing,
            ChatError::Tickets(inner) => inner.into(),
            ChatError::ExtractionParse(msg) => ZendaiError::ExtractionParse(msg),
            ChatError::Generation(msg) => ZendaiError::Generation(msg),
            ChatError::Storage(msg) => ZendaiError::Storage(msg),
        }
    }
}
