//! Ticket backend adapter.
//!
//! [`TicketSource`] is the seam the chat pipeline depends on;
//! [`ZendeskClient`] implements it against the Zendesk request search API
//! using the caller's own credentials.

pub mod client;
pub mod error;

pub use client::{TicketSource, ZendeskClient};
pub use error::TicketError;
