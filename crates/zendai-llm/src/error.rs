use zendai_core::error::ZendaiError;

/// Errors from a completion provider.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Completion API key not configured")]
    MissingApiKey,

    #[error("Completion request failed: {0}")]
    Request(String),

    #[error("Completion API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Completion response could not be decoded: {0}")]
    Decode(String),

    #[error("Completion response contained no text")]
    EmptyCompletion,
}

impl From<LlmError> for ZendaiError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey => ZendaiError::Config(err.to_string()),
            other => ZendaiError::Generation(other.to_string()),
        }
    }
}
