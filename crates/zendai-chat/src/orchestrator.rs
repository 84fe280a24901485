//! The message pipeline.

use std::sync::Arc;

use tracing::{info, warn};

use zendai_core::config::ZendaiConfig;
use zendai_core::types::{Message, TicketRecord, TicketRequirement, User};
use zendai_llm::CompletionProvider;
use zendai_storage::ChatStore;
use zendai_zendesk::TicketSource;

use crate::error::ChatError;
use crate::extractor::RequirementExtractor;
use crate::responder::ConversationalResponder;

/// Result of posting a message into a session.
#[derive(Debug)]
pub struct MessageOutcome {
    pub user_message: Message,
    pub assistant_message: Message,
    pub tickets: Vec<TicketRecord>,
}

/// Result of a session-less one-shot question.
#[derive(Debug)]
pub struct AskOutcome {
    pub answer: String,
    pub requirement: TicketRequirement,
}

/// Drives a user message through validation, the credential gate, ticket
/// retrieval, generation, and persistence.
pub struct ChatOrchestrator {
    store: Arc<ChatStore>,
    tickets: Arc<dyn TicketSource>,
    extractor: RequirementExtractor,
    responder: ConversationalResponder,
    max_message_length: usize,
}

impl ChatOrchestrator {
    pub fn new(
        store: Arc<ChatStore>,
        tickets: Arc<dyn TicketSource>,
        llm: Arc<dyn CompletionProvider>,
        config: &ZendaiConfig,
    ) -> Self {
        Self {
            store,
            tickets,
            extractor: RequirementExtractor::new(
                Arc::clone(&llm),
                config.llm.max_extraction_tokens,
            ),
            responder: ConversationalResponder::new(llm, config.chat.history_turns),
            max_message_length: config.chat.max_message_length,
        }
    }

    /// Post a message into one of the user's sessions and return the
    /// persisted exchange.
    ///
    /// The credential gate runs before any outbound call. If generation
    /// fails after the user's text was accepted, the user message is
    /// persisted alone so the transcript still shows what was asked.
    pub async fn handle_message(
        &self,
        user: &User,
        session_id: i64,
        text: &str,
    ) -> Result<MessageOutcome, ChatError> {
        let text = self.validate(text)?;
        let session = self.store.get_session(user.id, session_id)?;
        let credentials = user
            .zendesk_credentials()
            .ok_or(ChatError::CredentialsMissing)?;

        if session.session.display_name.is_none() {
            self.name_session(session_id, text).await;
        }

        let tickets = self.tickets.fetch_tickets(&credentials).await?;

        match self
            .responder
            .respond(text, &session.messages, &tickets)
            .await
        {
            Ok(answer) => {
                let (user_message, assistant_message) =
                    self.store.append_exchange(session_id, text, &answer)?;
                info!(session_id, "exchange persisted");
                Ok(MessageOutcome {
                    user_message,
                    assistant_message,
                    tickets,
                })
            }
            Err(err) => {
                // Keep the question on record even though no answer exists.
                if let Err(store_err) = self.store.append_message(
                    session_id,
                    zendai_core::types::MessageRole::User,
                    text,
                ) {
                    warn!(session_id, error = %store_err, "failed to persist orphaned user message");
                }
                Err(err)
            }
        }
    }

    /// Answer a one-shot question with no session: classify the query and
    /// generate a reply over the ticket snapshot, concurrently.
    pub async fn ask(&self, user: &User, text: &str) -> Result<AskOutcome, ChatError> {
        let text = self.validate(text)?;
        let credentials = user
            .zendesk_credentials()
            .ok_or(ChatError::CredentialsMissing)?;

        let tickets = self.tickets.fetch_tickets(&credentials).await?;

        let (requirement, answer) = tokio::join!(
            self.extractor.extract(text),
            self.responder.respond(text, &[], &tickets),
        );

        Ok(AskOutcome {
            answer: answer?,
            requirement: requirement?,
        })
    }

    fn validate<'a>(&self, text: &'a str) -> Result<&'a str, ChatError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if trimmed.chars().count() > self.max_message_length {
            return Err(ChatError::MessageTooLong(self.max_message_length));
        }
        Ok(trimmed)
    }

    /// Best-effort first-message naming. Failures are logged and never
    /// block the exchange.
    async fn name_session(&self, session_id: i64, first_message: &str) {
        match self.responder.summarize_heading(first_message).await {
            Ok(heading) if !heading.is_empty() => {
                match self.store.set_name_if_unset(session_id, &heading) {
                    Ok(named) => {
                        if named {
                            info!(session_id, heading = %heading, "session named");
                        }
                    }
                    Err(err) => warn!(session_id, error = %err, "failed to store session name"),
                }
            }
            Ok(_) => warn!(session_id, "heading summarization returned nothing"),
            Err(err) => warn!(session_id, error = %err, "heading summarization failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use zendai_core::types::{MessageRole, ZendeskCredentials};
    use zendai_llm::{CompletionRequest, LlmError};
    use zendai_storage::{Database, NewUser, UserRepository};
    use zendai_zendesk::TicketError;

    /// Dispatches on the request shape: heading prompts, extraction
    /// prompts, and everything else get their own canned reply.
    struct ScriptedLlm {
        heading: Result<String, String>,
        extraction: String,
        answer: Result<String, String>,
    }

    impl Default for ScriptedLlm {
        fn default() -> Self {
            Self {
                heading: Ok("Ticket Overview".to_string()),
                extraction: r#"{"is_ticket_by_id": false, "tickets_in_timeperiod": false,
                    "tickets_by_agent": false, "tickets_by_agent_in_period": false}"#
                    .to_string(),
                answer: Ok("You have 1 ticket.".to_string()),
            }
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedLlm {
        async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
            let first_turn = &request.turns[0].text;
            if first_turn.starts_with("Summarize this into a heading:") {
                return self
                    .heading
                    .clone()
                    .map_err(LlmError::Request);
            }
            if request
                .system
                .as_deref()
                .is_some_and(|s| s.contains("Tickets AI agent"))
            {
                return Ok(self.extraction.clone());
            }
            self.answer.clone().map_err(LlmError::Request)
        }
    }

    struct StubTickets {
        snapshot: Result<Vec<TicketRecord>, String>,
        calls: AtomicUsize,
    }

    impl StubTickets {
        fn with(snapshot: Vec<TicketRecord>) -> Self {
            Self {
                snapshot: Ok(snapshot),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                snapshot: Err("connection refused".to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TicketSource for StubTickets {
        async fn fetch_tickets(
            &self,
            _credentials: &ZendeskCredentials,
        ) -> Result<Vec<TicketRecord>, TicketError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.snapshot
                .clone()
                .map_err(TicketError::Unavailable)
        }
    }

    fn ticket(id: i64) -> TicketRecord {
        TicketRecord {
            id,
            assignee_id: None,
            subject: format!("Ticket {id}"),
            description: String::new(),
            created_at: "2024-03-01T09:00:00Z".to_string(),
            status: "open".to_string(),
            url: String::new(),
            via: serde_json::Value::Null,
        }
    }

    struct Fixture {
        store: Arc<ChatStore>,
        user: User,
        user_without_creds: User,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Database::in_memory().unwrap());
        let users = UserRepository::new(Arc::clone(&db));
        let alice = users
            .create(&NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "h".to_string(),
            })
            .unwrap();
        let alice = users
            .update_credentials(alice.id, Some("dG9rZW4="), Some("acme"))
            .unwrap();
        let bob = users
            .create(&NewUser {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: "h".to_string(),
            })
            .unwrap();
        Fixture {
            store: Arc::new(ChatStore::new(db)),
            user: alice,
            user_without_creds: bob,
        }
    }

    fn orchestrator(
        store: Arc<ChatStore>,
        tickets: StubTickets,
        llm: ScriptedLlm,
    ) -> (ChatOrchestrator, Arc<StubTickets>) {
        let tickets = Arc::new(tickets);
        let orchestrator = ChatOrchestrator::new(
            store,
            Arc::clone(&tickets) as Arc<dyn TicketSource>,
            Arc::new(llm),
            &ZendaiConfig::default(),
        );
        (orchestrator, tickets)
    }

    #[tokio::test]
    async fn test_full_exchange_persists_and_names() {
        let fx = fixture();
        let session = fx.store.create_session(fx.user.id).unwrap();
        let (orch, _) = orchestrator(
            Arc::clone(&fx.store),
            StubTickets::with(vec![ticket(7)]),
            ScriptedLlm::default(),
        );

        let outcome = orch
            .handle_message(&fx.user, session.id, "what tickets do I have")
            .await
            .unwrap();

        assert_eq!(outcome.user_message.role, MessageRole::User);
        assert_eq!(outcome.assistant_message.text, "You have 1 ticket.");
        assert_eq!(outcome.tickets.len(), 1);

        let stored = fx.store.get_session(fx.user.id, session.id).unwrap();
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.session.display_name.as_deref(), Some("Ticket Overview"));
    }

    #[tokio::test]
    async fn test_second_message_keeps_first_name() {
        let fx = fixture();
        let session = fx.store.create_session(fx.user.id).unwrap();
        let (orch, _) = orchestrator(
            Arc::clone(&fx.store),
            StubTickets::with(vec![]),
            ScriptedLlm::default(),
        );

        orch.handle_message(&fx.user, session.id, "first").await.unwrap();

        let mut llm = ScriptedLlm::default();
        llm.heading = Ok("A Different Heading".to_string());
        let (orch, _) = orchestrator(Arc::clone(&fx.store), StubTickets::with(vec![]), llm);
        orch.handle_message(&fx.user, session.id, "second").await.unwrap();

        let stored = fx.store.get_session(fx.user.id, session.id).unwrap();
        assert_eq!(stored.session.display_name.as_deref(), Some("Ticket Overview"));
        assert_eq!(stored.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_heading_failure_does_not_block_exchange() {
        let fx = fixture();
        let session = fx.store.create_session(fx.user.id).unwrap();
        let mut llm = ScriptedLlm::default();
        llm.heading = Err("model offline".to_string());
        let (orch, _) = orchestrator(Arc::clone(&fx.store), StubTickets::with(vec![]), llm);

        let outcome = orch.handle_message(&fx.user, session.id, "hi").await.unwrap();
        assert_eq!(outcome.assistant_message.text, "You have 1 ticket.");

        let stored = fx.store.get_session(fx.user.id, session.id).unwrap();
        assert!(stored.session.display_name.is_none());
    }

    #[tokio::test]
    async fn test_credential_gate_runs_before_any_outbound_call() {
        let fx = fixture();
        let session = fx.store.create_session(fx.user_without_creds.id).unwrap();
        let (orch, tickets) = orchestrator(
            Arc::clone(&fx.store),
            StubTickets::with(vec![]),
            ScriptedLlm::default(),
        );

        let err = orch
            .handle_message(&fx.user_without_creds, session.id, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::CredentialsMissing));
        assert_eq!(tickets.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_foreign_session_is_not_found() {
        let fx = fixture();
        let session = fx.store.create_session(fx.user_without_creds.id).unwrap();
        let (orch, _) = orchestrator(
            Arc::clone(&fx.store),
            StubTickets::with(vec![]),
            ScriptedLlm::default(),
        );

        let err = orch
            .handle_message(&fx.user, session.id, "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound));
    }

    #[tokio::test]
    async fn test_empty_and_oversized_messages_rejected() {
        let fx = fixture();
        let session = fx.store.create_session(fx.user.id).unwrap();
        let (orch, _) = orchestrator(
            Arc::clone(&fx.store),
            StubTickets::with(vec![]),
            ScriptedLlm::default(),
        );

        let err = orch.handle_message(&fx.user, session.id, "   ").await.unwrap_err();
        assert!(matches!(err, ChatError::EmptyMessage));

        let long = "x".repeat(2001);
        let err = orch.handle_message(&fx.user, session.id, &long).await.unwrap_err();
        assert!(matches!(err, ChatError::MessageTooLong(2000)));
    }

    #[tokio::test]
    async fn test_adapter_failure_surfaces_without_persisting() {
        let fx = fixture();
        let session = fx.store.create_session(fx.user.id).unwrap();
        let (orch, _) = orchestrator(
            Arc::clone(&fx.store),
            StubTickets::failing(),
            ScriptedLlm::default(),
        );

        let err = orch.handle_message(&fx.user, session.id, "hi").await.unwrap_err();
        assert!(matches!(err, ChatError::Tickets(_)));

        let stored = fx.store.get_session(fx.user.id, session.id).unwrap();
        assert!(stored.messages.is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_user_message() {
        let fx = fixture();
        let session = fx.store.create_session(fx.user.id).unwrap();
        let mut llm = ScriptedLlm::default();
        llm.answer = Err("model offline".to_string());
        let (orch, _) = orchestrator(Arc::clone(&fx.store), StubTickets::with(vec![]), llm);

        let err = orch
            .handle_message(&fx.user, session.id, "what tickets do I have")
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Generation(_)));

        let stored = fx.store.get_session(fx.user.id, session.id).unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.messages[0].role, MessageRole::User);
        assert_eq!(stored.messages[0].text, "what tickets do I have");
    }

    #[tokio::test]
    async fn test_empty_snapshot_still_answers() {
        let fx = fixture();
        let session = fx.store.create_session(fx.user.id).unwrap();
        let (orch, _) = orchestrator(
            Arc::clone(&fx.store),
            StubTickets::with(vec![]),
            ScriptedLlm::default(),
        );

        let outcome = orch.handle_message(&fx.user, session.id, "anything?").await.unwrap();
        assert!(outcome.tickets.is_empty());
        assert_eq!(outcome.assistant_message.text, "You have 1 ticket.");
    }

    #[tokio::test]
    async fn test_ask_returns_answer_and_requirement() {
        let fx = fixture();
        let mut llm = ScriptedLlm::default();
        llm.extraction = r#"{"is_ticket_by_id": 42}"#.to_string();
        let (orch, _) = orchestrator(Arc::clone(&fx.store), StubTickets::with(vec![ticket(42)]), llm);

        let outcome = orch.ask(&fx.user, "show me ticket 42").await.unwrap();
        assert_eq!(outcome.answer, "You have 1 ticket.");
        assert_eq!(outcome.requirement.ticket_id, Some(42));
    }

    #[tokio::test]
    async fn test_ask_requires_credentials() {
        let fx = fixture();
        let (orch, tickets) = orchestrator(
            Arc::clone(&fx.store),
            StubTickets::with(vec![]),
            ScriptedLlm::default(),
        );

        let err = orch.ask(&fx.user_without_creds, "hello").await.unwrap_err();
        assert!(matches!(err, ChatError::CredentialsMissing));
        assert_eq!(tickets.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ask_surfaces_extraction_parse_failure() {
        let fx = fixture();
        let mut llm = ScriptedLlm::default();
        llm.extraction = "Sure, here you go!".to_string();
        let (orch, _) = orchestrator(Arc::clone(&fx.store), StubTickets::with(vec![]), llm);

        let err = orch.ask(&fx.user, "show me ticket 42").await.unwrap_err();
        assert!(matches!(err, ChatError::ExtractionParse(_)));
    }
}
