//! ZendAI storage crate - SQLite persistence for users, sessions, messages.
//!
//! Provides a WAL-mode SQLite database with migrations, a user repository
//! (registration, lookup, Zendesk credential updates), and the chat store
//! (sessions with ordered messages, transactional exchange writes,
//! exactly-once session naming).

pub mod chats;
pub mod db;
pub mod migrations;
pub mod users;

pub use chats::ChatStore;
pub use db::Database;
pub use users::{NewUser, UserRepository};
