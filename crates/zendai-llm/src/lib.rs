//! Text completion providers.
//!
//! The rest of the system talks to a model through the
//! [`CompletionProvider`] trait; [`OpenAiProvider`] is the production
//! implementation against an OpenAI-compatible chat completions API.

pub mod error;
pub mod openai;
pub mod provider;

pub use error::LlmError;
pub use openai::OpenAiProvider;
pub use provider::{ChatTurn, CompletionProvider, CompletionRequest};
