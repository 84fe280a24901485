//! Password hashing, JWT issuance, and the bearer-auth middleware.
//!
//! Login exchanges a username and password for an HS256 JWT whose subject
//! is the user id. `require_auth` validates the token on protected routes
//! and stashes the resolved [`User`] in request extensions for handlers.

use std::sync::OnceLock;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use regex::Regex;
use serde::{Deserialize, Serialize};

use zendai_core::types::User;

use crate::error::ApiError;
use crate::state::AppState;

/// JWT payload: the user id as subject and the expiry instant.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,7}$")
            .unwrap_or_else(|e| panic!("invalid email regex: {e}"))
    })
}

/// Validate registration input before touching storage.
pub fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), ApiError> {
    if username.trim().is_empty() {
        return Err(ApiError::BadRequest("Username must not be empty".to_string()));
    }
    if username.len() > 64 {
        return Err(ApiError::BadRequest(
            "Username must be at most 64 characters".to_string(),
        ));
    }
    // A malformed email is a 409 like the duplicate cases, not a 400.
    if !email_regex().is_match(email) {
        return Err(ApiError::Conflict("Email not valid".to_string()));
    }
    if password.len() < 8 {
        return Err(ApiError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| ApiError::Internal(format!("Password hashing failed: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// Issue a signed token for a user.
pub fn issue_token(user_id: i64, secret: &str, expiry_minutes: i64) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::minutes(expiry_minutes)).timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("Token signing failed: {}", e)))
}

/// Decode a token and return the user id it was issued for.
pub fn decode_user_id(token: &str, secret: &str) -> Result<i64, ApiError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("Could not validate credentials".to_string()))?;

    data.claims
        .sub
        .parse()
        .map_err(|_| ApiError::Unauthorized("Could not validate credentials".to_string()))
}

/// Middleware that validates Bearer token authentication.
///
/// Decodes the JWT, loads the user it names, and inserts the [`User`]
/// into request extensions. Returns 401 if any step fails.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let token = req
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    let Some(token) = token else {
        return ApiError::Unauthorized("Missing Authorization header".to_string()).into_response();
    };

    let user_id = match decode_user_id(token, &state.config.auth.secret_key) {
        Ok(id) => id,
        Err(err) => return err.into_response(),
    };

    let user: Option<User> = match state.users.find_by_id(user_id) {
        Ok(user) => user,
        Err(err) => return ApiError::from(err).into_response(),
    };

    match user {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => {
            ApiError::Unauthorized("Could not validate credentials".to_string()).into_response()
        }
    }
}
