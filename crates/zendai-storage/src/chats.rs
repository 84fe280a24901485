//! The chat session store: sessions and their ordered messages.
//!
//! Ownership is folded into every session lookup predicate so a session
//! belonging to another user is indistinguishable from one that does not
//! exist. Messages are append-only; the canonical conversation order is
//! created_at ascending with the rowid breaking ties.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rusqlite::{Connection, Row};

use zendai_core::error::ZendaiError;
use zendai_core::types::{ChatSession, Message, MessageRole, SessionWithMessages};

use crate::db::Database;

/// Store for chat sessions and messages.
pub struct ChatStore {
    db: Arc<Database>,
}

impl ChatStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create an empty session for a user. The display name starts unset
    /// and is filled in exactly once by [`ChatStore::set_name_if_unset`].
    pub fn create_session(&self, owner_id: i64) -> Result<ChatSession, ZendaiError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chats (user_id) VALUES (?1)",
                rusqlite::params![owner_id],
            )
            .map_err(|e| ZendaiError::Storage(format!("Failed to create session: {}", e)))?;

            let id = conn.last_insert_rowid();
            load_session(conn, owner_id, id)?.ok_or(ZendaiError::NotFound)
        })
    }

    /// List a user's sessions, newest first, each with its messages.
    pub fn list_sessions(&self, owner_id: i64) -> Result<Vec<SessionWithMessages>, ZendaiError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, display_name, created_at
                     FROM chats WHERE user_id = ?1
                     ORDER BY created_at DESC, id DESC",
                )
                .map_err(|e| ZendaiError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![owner_id], row_to_session)
                .map_err(|e| ZendaiError::Storage(e.to_string()))?;

            let mut sessions = Vec::new();
            for row in rows {
                let session = row.map_err(|e| ZendaiError::Storage(e.to_string()))?;
                let messages = load_messages(conn, session.id)?;
                sessions.push(SessionWithMessages { session, messages });
            }
            Ok(sessions)
        })
    }

    /// Fetch one session with its ordered messages.
    ///
    /// Returns `NotFound` both when the session does not exist and when it
    /// belongs to someone else.
    pub fn get_session(
        &self,
        owner_id: i64,
        session_id: i64,
    ) -> Result<SessionWithMessages, ZendaiError> {
        self.db.with_conn(|conn| {
            let session = load_session(conn, owner_id, session_id)?.ok_or(ZendaiError::NotFound)?;
            let messages = load_messages(conn, session.id)?;
            Ok(SessionWithMessages { session, messages })
        })
    }

    /// The ordered messages of a session, oldest first.
    pub fn messages(&self, session_id: i64) -> Result<Vec<Message>, ZendaiError> {
        self.db.with_conn(|conn| load_messages(conn, session_id))
    }

    /// Append one message at the end of a session's order.
    pub fn append_message(
        &self,
        session_id: i64,
        role: MessageRole,
        text: &str,
    ) -> Result<Message, ZendaiError> {
        self.db.with_conn(|conn| {
            let id = insert_message(conn, session_id, role, text)?;
            load_message(conn, id)?.ok_or(ZendaiError::NotFound)
        })
    }

    /// Append a user message and the assistant's reply in one transaction,
    /// in that order, so a concurrent writer can never interleave the pair.
    pub fn append_exchange(
        &self,
        session_id: i64,
        user_text: &str,
        assistant_text: &str,
    ) -> Result<(Message, Message), ZendaiError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| ZendaiError::Storage(format!("Failed to begin transaction: {}", e)))?;

            let user_id = insert_message(&tx, session_id, MessageRole::User, user_text)?;
            let assistant_id =
                insert_message(&tx, session_id, MessageRole::Assistant, assistant_text)?;

            let user_msg = load_message(&tx, user_id)?.ok_or(ZendaiError::NotFound)?;
            let assistant_msg = load_message(&tx, assistant_id)?.ok_or(ZendaiError::NotFound)?;

            tx.commit()
                .map_err(|e| ZendaiError::Storage(format!("Failed to commit exchange: {}", e)))?;

            Ok((user_msg, assistant_msg))
        })
    }

    /// Set the display name if it is still unset. Returns whether this
    /// call performed the naming; once set, later calls are no-ops.
    pub fn set_name_if_unset(&self, session_id: i64, name: &str) -> Result<bool, ZendaiError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE chats SET display_name = ?1
                     WHERE id = ?2 AND display_name IS NULL",
                    rusqlite::params![name, session_id],
                )
                .map_err(|e| ZendaiError::Storage(format!("Failed to name session: {}", e)))?;
            Ok(changed > 0)
        })
    }
}

fn insert_message(
    conn: &Connection,
    session_id: i64,
    role: MessageRole,
    text: &str,
) -> Result<i64, ZendaiError> {
    conn.execute(
        "INSERT INTO messages (chat_id, role, body) VALUES (?1, ?2, ?3)",
        rusqlite::params![session_id, role.as_str(), text],
    )
    .map_err(|e| ZendaiError::Storage(format!("Failed to append message: {}", e)))?;
    Ok(conn.last_insert_rowid())
}

fn load_session(
    conn: &Connection,
    owner_id: i64,
    session_id: i64,
) -> Result<Option<ChatSession>, ZendaiError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, user_id, display_name, created_at
             FROM chats WHERE id = ?1 AND user_id = ?2",
        )
        .map_err(|e| ZendaiError::Storage(e.to_string()))?;

    match stmt.query_row(rusqlite::params![session_id, owner_id], row_to_session) {
        Ok(session) => Ok(Some(session)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(ZendaiError::Storage(e.to_string())),
    }
}

fn load_message(conn: &Connection, id: i64) -> Result<Option<Message>, ZendaiError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, chat_id, role, body, created_at
             FROM messages WHERE id = ?1",
        )
        .map_err(|e| ZendaiError::Storage(e.to_string()))?;

    match stmt.query_row(rusqlite::params![id], row_to_message) {
        Ok(message) => Ok(Some(message)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(ZendaiError::Storage(e.to_string())),
    }
}

fn load_messages(conn: &Connection, session_id: i64) -> Result<Vec<Message>, ZendaiError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, chat_id, role, body, created_at
             FROM messages WHERE chat_id = ?1
             ORDER BY created_at ASC, id ASC",
        )
        .map_err(|e| ZendaiError::Storage(e.to_string()))?;

    let rows = stmt
        .query_map(rusqlite::params![session_id], row_to_message)
        .map_err(|e| ZendaiError::Storage(e.to_string()))?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(row.map_err(|e| ZendaiError::Storage(e.to_string()))?);
    }
    Ok(messages)
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<ChatSession> {
    let created_at: i64 = row.get(3)?;
    Ok(ChatSession {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        display_name: row.get(2)?,
        created_at: Utc
            .timestamp_opt(created_at, 0)
            .single()
            .unwrap_or_default(),
    })
}

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let role_str: String = row.get(2)?;
    let created_at: i64 = row.get(4)?;
    Ok(Message {
        id: row.get(0)?,
        session_id: row.get(1)?,
        role: MessageRole::parse(&role_str).unwrap_or(MessageRole::User),
        text: row.get(3)?,
        created_at: Utc
            .timestamp_opt(created_at, 0)
            .single()
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{NewUser, UserRepository};

    fn make_store() -> (ChatStore, i64, i64) {
        let db = Arc::new(Database::in_memory().unwrap());
        let users = UserRepository::new(Arc::clone(&db));
        let alice = users
            .create(&NewUser {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                password_hash: "h".to_string(),
            })
            .unwrap();
        let bob = users
            .create(&NewUser {
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                password_hash: "h".to_string(),
            })
            .unwrap();
        (ChatStore::new(db), alice.id, bob.id)
    }

    #[test]
    fn test_create_session_starts_unnamed() {
        let (store, alice, _) = make_store();
        let session = store.create_session(alice).unwrap();
        assert_eq!(session.owner_id, alice);
        assert!(session.display_name.is_none());
    }

    #[test]
    fn test_get_session_with_messages() {
        let (store, alice, _) = make_store();
        let session = store.create_session(alice).unwrap();

        store
            .append_message(session.id, MessageRole::User, "list my tickets")
            .unwrap();
        store
            .append_message(session.id, MessageRole::Assistant, "You have 1 ticket.")
            .unwrap();

        let full = store.get_session(alice, session.id).unwrap();
        assert_eq!(full.messages.len(), 2);
        assert_eq!(full.messages[0].role, MessageRole::User);
        assert_eq!(full.messages[0].text, "list my tickets");
        assert_eq!(full.messages[1].role, MessageRole::Assistant);
    }

    #[test]
    fn test_ownership_isolation() {
        let (store, alice, bob) = make_store();
        let session = store.create_session(alice).unwrap();

        // Bob sees NotFound, never alice's contents.
        let err = store.get_session(bob, session.id).unwrap_err();
        assert!(matches!(err, ZendaiError::NotFound));
    }

    #[test]
    fn test_get_missing_session() {
        let (store, alice, _) = make_store();
        let err = store.get_session(alice, 12345).unwrap_err();
        assert!(matches!(err, ZendaiError::NotFound));
    }

    #[test]
    fn test_list_sessions_newest_first() {
        let (store, alice, _) = make_store();
        let first = store.create_session(alice).unwrap();
        let second = store.create_session(alice).unwrap();

        let sessions = store.list_sessions(alice).unwrap();
        assert_eq!(sessions.len(), 2);
        // Same-second creations fall back to id order, newest first.
        assert_eq!(sessions[0].session.id, second.id);
        assert_eq!(sessions[1].session.id, first.id);
    }

    #[test]
    fn test_list_sessions_excludes_other_owners() {
        let (store, alice, bob) = make_store();
        store.create_session(alice).unwrap();
        store.create_session(bob).unwrap();

        let sessions = store.list_sessions(alice).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session.owner_id, alice);
    }

    #[test]
    fn test_message_order_is_stable_within_one_second() {
        let (store, alice, _) = make_store();
        let session = store.create_session(alice).unwrap();

        // All inserted in the same second; ids must break the tie.
        for i in 0..10 {
            store
                .append_message(session.id, MessageRole::User, &format!("msg {}", i))
                .unwrap();
        }

        let messages = store.messages(session.id).unwrap();
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg.text, format!("msg {}", i));
        }
    }

    #[test]
    fn test_append_exchange_preserves_pair_order() {
        let (store, alice, _) = make_store();
        let session = store.create_session(alice).unwrap();

        let (user_msg, assistant_msg) = store
            .append_exchange(session.id, "question", "answer")
            .unwrap();
        assert_eq!(user_msg.role, MessageRole::User);
        assert_eq!(assistant_msg.role, MessageRole::Assistant);
        assert!(user_msg.id < assistant_msg.id);

        let messages = store.messages(session.id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].text, "question");
        assert_eq!(messages[1].text, "answer");
    }

    #[test]
    fn test_append_exchange_to_missing_session_writes_nothing() {
        let (store, _, _) = make_store();
        // FK violation rolls the whole transaction back.
        assert!(store.append_exchange(999, "q", "a").is_err());
        assert!(store.messages(999).unwrap().is_empty());
    }

    #[test]
    fn test_naming_happens_exactly_once() {
        let (store, alice, _) = make_store();
        let session = store.create_session(alice).unwrap();

        assert!(store.set_name_if_unset(session.id, "First heading").unwrap());
        assert!(!store.set_name_if_unset(session.id, "Second heading").unwrap());

        let full = store.get_session(alice, session.id).unwrap();
        assert_eq!(full.session.display_name.as_deref(), Some("First heading"));
    }

    #[test]
    fn test_naming_unknown_session_is_noop() {
        let (store, _, _) = make_store();
        assert!(!store.set_name_if_unset(999, "heading").unwrap());
    }
}
