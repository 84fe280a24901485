//! The ticket chat pipeline.
//!
//! [`ChatOrchestrator`] drives a message through validation, the
//! credential gate, ticket retrieval, and response generation, persisting
//! the exchange through the session store. [`RequirementExtractor`] and
//! [`ConversationalResponder`] are the two model-backed stages it
//! composes.

pub mod error;
pub mod extractor;
pub mod history;
pub mod orchestrator;
pub mod responder;

pub use error::ChatError;
pub use extractor::RequirementExtractor;
pub use orchestrator::{AskOutcome, ChatOrchestrator, MessageOutcome};
pub use responder::ConversationalResponder;
