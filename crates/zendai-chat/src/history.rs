//! History replay windowing.

use zendai_core::types::Message;
use zendai_llm::ChatTurn;

/// Convert the tail of a session's messages into provider turns.
///
/// `turns` counts user/assistant pairs; the window keeps the most recent
/// `turns * 2` messages so a pair is never split at the cut. Zero
/// disables replay entirely.
pub fn window(messages: &[Message], turns: usize) -> Vec<ChatTurn> {
    let keep = turns.saturating_mul(2);
    let start = messages.len().saturating_sub(keep);
    messages[start..]
        .iter()
        .map(|m| ChatTurn {
            role: m.role.as_str(),
            text: m.text.clone(),
        })
        .collect()
}
