//! HTTP API for the ticket chat backend.
//!
//! Exposes registration, login, profile and credential management, chat
//! sessions and their message pipeline, and the session-less one-shot
//! endpoint, all behind JWT bearer authentication.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::{create_router, start_server};
pub use state::AppState;
