//! ZendAI core crate - shared types, error taxonomy, configuration.
//!
//! Every other crate in the workspace depends on this one. It holds the
//! persisted entity types (users, chat sessions, messages), the ephemeral
//! per-request ticket types, the top-level error enum, and the TOML
//! configuration with its sectioned defaults.

pub mod config;
pub mod error;
pub mod types;

pub use config::ZendaiConfig;
pub use error::{Result, ZendaiError};
