//! Structured requirement extraction.
//!
//! Classifies a user query into which ticket filter it is asking for by
//! prompting the model for a fixed four-slot JSON object. A slot holding
//! the literal `false` means "not requested".

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use zendai_core::types::TicketRequirement;
use zendai_llm::{CompletionProvider, CompletionRequest};

use crate::error::ChatError;

const EXTRACTION_INSTRUCTIONS: &str = r#"Act as a Tickets AI agent. You will be given a query and based on which you need to output certain processings in a JSON format. Your output should be only in JSON, no greetings text or replies or explanations required. IT IS IMPORTANT TO OUTPUT ONLY IN JSON FORMAT.
Format:
{
    "is_ticket_by_id": 'Should only be integer. Write ticket id if query is asking a operation for a particular/specific ticket by id else if not then write false',
    "tickets_in_timeperiod": 'Should only be NAME of month. Write only the name of the Months, if query is asking for tickets that belongs to a specific timeperiod then write its closest month, DO NOT WRITE ANYTHING EXCEPT NAME OF THE MONTH else write false',
    "tickets_by_agent": 'Should only be name of assignee/agent. Write the name of the agent if query is asking a operation by certain agents or customer support tickets else write false',
    "tickets_by_agent_in_period": 'Should only be name of agent,month name. Write the name of the agent along with the name of the month like (agent 1, february) separated by a comma (,) if query is asking a operation by certain agent in relation with time period (DO NOT WRITE ANYTHING EXCEPT NAME OF THE AGENT,MONTH) else write false',
}

PROPERLY WRITE THE KEYS IN JSON FORMAT WITH VALID JSON OUTPUT.
ONLY OUTPUT IN JSON FORMAT."#;

/// Model-backed classifier for ticket queries.
pub struct RequirementExtractor {
    llm: Arc<dyn CompletionProvider>,
    max_tokens: u32,
}

impl RequirementExtractor {
    pub fn new(llm: Arc<dyn CompletionProvider>, max_tokens: u32) -> Self {
        Self { llm, max_tokens }
    }

    /// Classify one query. Runs at temperature zero; the output must be
    /// the four-slot JSON object or the call fails with
    /// [`ChatError::ExtractionParse`].
    pub async fn extract(&self, query: &str) -> Result<TicketRequirement, ChatError> {
        let request = CompletionRequest::deterministic(EXTRACTION_INSTRUCTIONS, query)
            .with_max_tokens(self.max_tokens);
        let raw = self.llm.complete(request).await?;
        let requirement = parse_requirement(&raw)?;
        debug!(?requirement, "extracted ticket requirement");
        Ok(requirement)
    }
}

/// Parse the model's JSON into a [`TicketRequirement`].
///
/// Tolerates a fenced code block around the object. Each slot treats the
/// literal `false` (or `"false"`) as absent.
fn parse_requirement(raw: &str) -> Result<TicketRequirement, ChatError> {
    let body = strip_code_fence(raw.trim());
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ChatError::ExtractionParse(format!("not valid JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| ChatError::ExtractionParse("not a JSON object".to_string()))?;

    let ticket_id = match slot(object.get("is_ticket_by_id")) {
        None => None,
        Some(v) => Some(slot_as_id(v)?),
    };
    let month = slot(object.get("tickets_in_timeperiod"))
        .map(slot_as_text)
        .transpose()?;
    let agent = slot(object.get("tickets_by_agent"))
        .map(slot_as_text)
        .transpose()?;
    let agent_and_month = match slot(object.get("tickets_by_agent_in_period")) {
        None => None,
        Some(v) => {
            let text = slot_as_text(v)?;
            let (agent, month) = text.split_once(',').ok_or_else(|| {
                ChatError::ExtractionParse(format!(
                    "agent/period slot is not comma separated: {text:?}"
                ))
            })?;
            Some((agent.trim().to_string(), month.trim().to_string()))
        }
    };

    Ok(TicketRequirement {
        ticket_id,
        month,
        agent,
        agent_and_month,
    })
}

/// `None` when the slot is missing or holds the "not requested" marker.
fn slot(value: Option<&Value>) -> Option<&Value> {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => None,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => None,
        Some(v) => Some(v),
    }
}

fn slot_as_id(value: &Value) -> Result<i64, ChatError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ChatError::ExtractionParse(format!("ticket id not an integer: {n}"))),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| ChatError::ExtractionParse(format!("ticket id not an integer: {s:?}"))),
        other => Err(ChatError::ExtractionParse(format!(
            "ticket id slot has unexpected type: {other}"
        ))),
    }
}

fn slot_as_text(value: &Value) -> Result<String, ChatError> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        other => Err(ChatError::ExtractionParse(format!(
            "slot should be a string: {other}"
        ))),
    }
}

fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    // Drop an optional language tag after the opening fence.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim().trim_end_matches("```").trim()
}
