//! Repository for user accounts.
//!
//! Registration writes a single row guarded by UNIQUE constraints on
//! username and email, so a conflicting registration can never leave a
//! partial user behind. Credential updates touch only the fields given.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use rusqlite::Row;

use zendai_core::error::ZendaiError;
use zendai_core::types::User;

use crate::db::Database;

/// Input for creating a new user. The password is already hashed by the
/// caller; this crate never sees plaintext passwords.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Repository for user rows.
pub struct UserRepository {
    db: Arc<Database>,
}

impl UserRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Insert a new user and return the stored row.
    ///
    /// A UNIQUE violation on username or email maps to `Conflict` naming
    /// the offending field.
    pub fn create(&self, new_user: &NewUser) -> Result<User, ZendaiError> {
        self.db.with_conn(|conn| {
            let result = conn.execute(
                "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
                rusqlite::params![new_user.username, new_user.email, new_user.password_hash],
            );

            if let Err(e) = result {
                let msg = e.to_string();
                if msg.contains("users.email") {
                    return Err(ZendaiError::Conflict("Email".to_string()));
                }
                if msg.contains("users.username") {
                    return Err(ZendaiError::Conflict("Username".to_string()));
                }
                return Err(ZendaiError::Storage(format!("Failed to create user: {}", e)));
            }

            let id = conn.last_insert_rowid();
            load_user(conn, "id", &id.to_string())?.ok_or(ZendaiError::NotFound)
        })
    }

    /// Find a user by username.
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, ZendaiError> {
        self.db.with_conn(|conn| load_user(conn, "username", username))
    }

    /// Find a user by email.
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, ZendaiError> {
        self.db.with_conn(|conn| load_user(conn, "email", email))
    }

    /// Find a user by id.
    pub fn find_by_id(&self, id: i64) -> Result<Option<User>, ZendaiError> {
        self.db.with_conn(|conn| load_user(conn, "id", &id.to_string()))
    }

    /// Update the Zendesk credentials on a user row.
    ///
    /// Either field may be given independently; an absent field keeps its
    /// current value. Returns the updated row, or `NotFound` if the user
    /// does not exist.
    pub fn update_credentials(
        &self,
        id: i64,
        apikey: Option<&str>,
        subdomain: Option<&str>,
    ) -> Result<User, ZendaiError> {
        self.db.with_conn(|conn| {
            if let Some(key) = apikey {
                conn.execute(
                    "UPDATE users SET apikey = ?1 WHERE id = ?2",
                    rusqlite::params![key, id],
                )
                .map_err(|e| ZendaiError::Storage(format!("Failed to update apikey: {}", e)))?;
            }
            if let Some(sub) = subdomain {
                conn.execute(
                    "UPDATE users SET subdomain = ?1 WHERE id = ?2",
                    rusqlite::params![sub, id],
                )
                .map_err(|e| ZendaiError::Storage(format!("Failed to update subdomain: {}", e)))?;
            }

            load_user(conn, "id", &id.to_string())?.ok_or(ZendaiError::NotFound)
        })
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, apikey, subdomain, created_at";

fn load_user(
    conn: &rusqlite::Connection,
    column: &str,
    value: &str,
) -> Result<Option<User>, ZendaiError> {
    // `column` is always one of our own identifiers, never user input.
    let sql = format!("SELECT {} FROM users WHERE {} = ?1", USER_COLUMNS, column);
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| ZendaiError::Storage(e.to_string()))?;

    let result = stmt.query_row(rusqlite::params![value], row_to_user);
    match result {
        Ok(user) => Ok(Some(user)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(ZendaiError::Storage(e.to_string())),
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let created_at: i64 = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        apikey: row.get(4)?,
        subdomain: row.get(5)?,
        created_at: Utc
            .timestamp_opt(created_at, 0)
            .single()
            .unwrap_or_default(),
    })
}
