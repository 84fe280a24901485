use thiserror::Error;

/// Top-level error type for the ZendAI system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for ZendaiError` so that the `?` operator works
/// across crate boundaries. The API crate maps each variant to an HTTP
/// status code; no variant carries a raw upstream response body.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ZendaiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Incorrect username or password")]
    Unauthorized,

    #[error("{0} already in use")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Resource not found")]
    NotFound,

    #[error("Zendesk apikey and subdomain must be configured first")]
    CredentialsMissing,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Ticket backend unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Malformed ticket backend response: {0}")]
    MalformedUpstream(String),

    #[error("Requirement extraction returned invalid JSON: {0}")]
    ExtractionParse(String),

    #[error("Answer generation failed: {0}")]
    Generation(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ZendaiError {
    fn from(err: toml::de::Error) -> Self {
        ZendaiError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ZendaiError {
    fn from(err: toml::ser::Error) -> Self {
        ZendaiError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ZendaiError {
    fn from(err: serde_json::Error) -> Self {
        ZendaiError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for ZendAI operations.
pub type Result<T> = std::result::Result<T, ZendaiError>;
