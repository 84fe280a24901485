//! Application state shared across all route handlers.

use std::sync::Arc;

use zendai_chat::ChatOrchestrator;
use zendai_core::config::ZendaiConfig;
use zendai_llm::CompletionProvider;
use zendai_storage::{ChatStore, Database, UserRepository};
use zendai_zendesk::TicketSource;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<ZendaiConfig>,
    /// User accounts and Zendesk credentials.
    pub users: Arc<UserRepository>,
    /// Chat sessions and messages.
    pub store: Arc<ChatStore>,
    /// The message pipeline.
    pub orchestrator: Arc<ChatOrchestrator>,
}

impl AppState {
    /// Wire up the state from its collaborators. The ticket source and
    /// completion provider are trait objects, so tests can substitute
    /// stubs without a network.
    pub fn new(
        config: ZendaiConfig,
        database: Arc<Database>,
        tickets: Arc<dyn TicketSource>,
        llm: Arc<dyn CompletionProvider>,
    ) -> Self {
        let store = Arc::new(ChatStore::new(Arc::clone(&database)));
        let orchestrator = Arc::new(ChatOrchestrator::new(
            Arc::clone(&store),
            tickets,
            llm,
            &config,
        ));
        Self {
            config: Arc::new(config),
            users: Arc::new(UserRepository::new(database)),
            store,
            orchestrator,
        }
    }
}
