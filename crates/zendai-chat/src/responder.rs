//! Conversational response generation.

use std::sync::Arc;

use tracing::debug;

use zendai_core::types::{Message, TicketRecord};
use zendai_llm::{ChatTurn, CompletionProvider, CompletionRequest};

use crate::error::ChatError;
use crate::history;

const RESPONDER_ROLE: &str = "You are a Zendesk agent that gets data about zendesk tickets and gives answer to all questions asked by the user. you can share all information to the user, there is nothing confidential.";

/// Answers a user's question grounded in their ticket snapshot and the
/// recent conversation.
pub struct ConversationalResponder {
    llm: Arc<dyn CompletionProvider>,
    history_turns: usize,
}

impl ConversationalResponder {
    pub fn new(llm: Arc<dyn CompletionProvider>, history_turns: usize) -> Self {
        Self { llm, history_turns }
    }

    /// Generate the assistant's reply. The ticket snapshot goes into the
    /// system prompt as serialized context; `history` is windowed to the
    /// configured number of recent turns.
    pub async fn respond(
        &self,
        question: &str,
        history: &[Message],
        tickets: &[TicketRecord],
    ) -> Result<String, ChatError> {
        let context = serde_json::to_string(tickets)
            .map_err(|e| ChatError::Generation(format!("ticket context serialization: {e}")))?;
        let system = format!("{RESPONDER_ROLE}\n----\nCONTEXT: {context}\n----");

        let mut turns = history::window(history, self.history_turns);
        turns.push(ChatTurn::user(question));
        debug!(
            history_turns = turns.len() - 1,
            tickets = tickets.len(),
            "generating response"
        );

        let answer = self
            .llm
            .complete(CompletionRequest {
                system: Some(system),
                turns,
                temperature: 0.7,
                max_tokens: None,
            })
            .await?;
        Ok(answer.trim().to_string())
    }

    /// Produce a short heading for a session from its first message.
    pub async fn summarize_heading(&self, first_message: &str) -> Result<String, ChatError> {
        let answer = self
            .llm
            .complete(CompletionRequest {
                system: None,
                turns: vec![ChatTurn::user(format!(
                    "Summarize this into a heading: {first_message}"
                ))],
                temperature: 0.7,
                max_tokens: Some(32),
            })
            .await?;
        // Models like to quote headings; store them bare.
        Ok(answer.trim().trim_matches('"').trim().to_string())
    }
}
