use zendai_core::error::ZendaiError;

/// Errors from the ticket backend.
#[derive(Debug, thiserror::Error)]
pub enum TicketError {
    #[error("Ticket backend unreachable: {0}")]
    Unavailable(String),

    #[error("Ticket backend returned status {status}")]
    Status { status: u16 },

    #[error("Ticket backend response was malformed: {0}")]
    Malformed(String),
}

impl From<TicketError> for ZendaiError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::Malformed(msg) => ZendaiError::MalformedUpstream(msg),
            other => ZendaiError::UpstreamUnavailable(other.to_string()),
        }
    }
}
