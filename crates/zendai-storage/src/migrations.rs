//! Database schema migrations.
//!
//! Applies the initial schema: users, chats, messages, and the
//! schema_migrations tracking table. Deleting a user cascades through
//! chats and messages.

use rusqlite::Connection;
use tracing::info;

use zendai_core::error::ZendaiError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), ZendaiError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ZendaiError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ZendaiError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<(), ZendaiError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            username        TEXT NOT NULL UNIQUE,
            email           TEXT NOT NULL UNIQUE,
            password_hash   TEXT NOT NULL,
            apikey          TEXT,
            subdomain       TEXT,
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_users_username ON users (username);
        CREATE INDEX IF NOT EXISTS idx_users_email ON users (email);

        CREATE TABLE IF NOT EXISTS chats (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL,
            display_name    TEXT,
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_chats_user
            ON chats (user_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS messages (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            chat_id         INTEGER NOT NULL,
            role            TEXT NOT NULL
                            CHECK (role IN ('user', 'assistant')),
            body            TEXT NOT NULL,
            created_at      INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
        );

        -- Canonical conversation order: created_at ASC, id ASC.
        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages (chat_id, created_at ASC, id ASC);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| ZendaiError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        conn
    }

    #[test]
    fn test_migrations_run_once() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        // Running again should be idempotent.
        run_migrations(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn test_users_unique_constraints() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (username, email, password_hash) VALUES ('a', 'a@x.com', 'h')",
            [],
        )
        .unwrap();

        let dup_username = conn.execute(
            "INSERT INTO users (username, email, password_hash) VALUES ('a', 'b@x.com', 'h')",
            [],
        );
        assert!(dup_username.is_err());

        let dup_email = conn.execute(
            "INSERT INTO users (username, email, password_hash) VALUES ('b', 'a@x.com', 'h')",
            [],
        );
        assert!(dup_email.is_err());
    }

    #[test]
    fn test_messages_role_check() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (username, email, password_hash) VALUES ('a', 'a@x.com', 'h')",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO chats (user_id) VALUES (1)", [])
            .unwrap();

        let result = conn.execute(
            "INSERT INTO messages (chat_id, role, body) VALUES (1, 'system', 'x')",
            [],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_user_delete_cascades_to_chats_and_messages() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        conn.execute(
            "INSERT INTO users (username, email, password_hash) VALUES ('a', 'a@x.com', 'h')",
            [],
        )
        .unwrap();
        conn.execute("INSERT INTO chats (user_id) VALUES (1)", [])
            .unwrap();
        conn.execute(
            "INSERT INTO messages (chat_id, role, body) VALUES (1, 'user', 'hello')",
            [],
        )
        .unwrap();

        conn.execute("DELETE FROM users WHERE id = 1", []).unwrap();

        let chats: i64 = conn
            .query_row("SELECT COUNT(*) FROM chats", [], |row| row.get(0))
            .unwrap();
        let messages: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(chats, 0);
        assert_eq!(messages, 0);
    }

    #[test]
    fn test_chat_foreign_key_enforced() {
        let conn = open_test_conn();
        run_migrations(&conn).unwrap();

        let result = conn.execute("INSERT INTO chats (user_id) VALUES (999)", []);
        assert!(result.is_err());
    }
}
