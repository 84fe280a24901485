//! Route handler functions for all API endpoints.
//!
//! Each handler extracts its input via axum extractors, talks to the
//! repositories or the orchestrator on AppState, and returns JSON.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};

use zendai_core::error::ZendaiError;
use zendai_core::types::{
    Message, SessionWithMessages, TicketRecord, TicketRequirement, User, UserProfile,
};
use zendai_storage::NewUser;

use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// OAuth2 password-grant form fields.
#[derive(Debug, Deserialize)]
pub struct TokenForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCredentialsRequest {
    pub apikey: Option<String>,
    pub subdomain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    /// Optional; only "user" is accepted. Assistant turns are produced
    /// by the pipeline, never posted.
    pub role: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question_text: String,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub user_message: Message,
    pub assistant_message: Message,
    pub tickets: Vec<TicketRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub requirement: TicketRequirement,
}

// =============================================================================
// Public handlers
// =============================================================================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// POST /register - create an account.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    auth::validate_registration(&body.username, &body.email, &body.password)?;
    let password_hash = auth::hash_password(&body.password)?;
    let user = state.users.create(&NewUser {
        username: body.username,
        email: body.email,
        password_hash,
    })?;
    tracing::info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(user.profile())))
}

/// POST /token - exchange username/password for a bearer token.
pub async fn token(
    State(state): State<AppState>,
    Form(form): Form<TokenForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .users
        .find_by_username(&form.username)?
        .filter(|user| auth::verify_password(&form.password, &user.password_hash))
        .ok_or(ZendaiError::Unauthorized)?;

    let access_token = auth::issue_token(
        user.id,
        &state.config.auth.secret_key,
        state.config.auth.token_expiry_minutes as i64,
    )?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        user: user.profile(),
    }))
}

// =============================================================================
// Protected handlers
// =============================================================================

/// GET /users/me - the authenticated user's profile.
pub async fn me(Extension(user): Extension<User>) -> Json<UserProfile> {
    Json(user.profile())
}

/// PATCH /users/me - update Zendesk credentials. Omitted fields keep
/// their stored values.
pub async fn update_credentials(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(body): Json<UpdateCredentialsRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let updated = state.users.update_credentials(
        user.id,
        body.apikey.as_deref(),
        body.subdomain.as_deref(),
    )?;
    tracing::info!(user_id = user.id, "zendesk credentials updated");
    Ok(Json(updated.profile()))
}

/// POST /chats - open a new empty session.
pub async fn create_chat(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<(StatusCode, Json<SessionWithMessages>), ApiError> {
    let session = state.store.create_session(user.id)?;
    Ok((
        StatusCode::CREATED,
        Json(SessionWithMessages {
            session,
            messages: Vec::new(),
        }),
    ))
}

/// GET /chats - the user's sessions, newest first, with messages.
pub async fn list_chats(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<SessionWithMessages>>, ApiError> {
    Ok(Json(state.store.list_sessions(user.id)?))
}

/// GET /chats/{id} - one session with its ordered messages.
pub async fn get_chat(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<i64>,
) -> Result<Json<SessionWithMessages>, ApiError> {
    Ok(Json(state.store.get_session(user.id, session_id)?))
}

/// POST /chats/{id}/messages - run the message pipeline.
pub async fn post_message(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<i64>,
    Json(body): Json<PostMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if body.role.as_deref().is_some_and(|r| r != "user") {
        return Err(ApiError::BadRequest(
            "Only user messages can be posted".to_string(),
        ));
    }
    let outcome = state
        .orchestrator
        .handle_message(&user, session_id, &body.message)
        .await?;
    Ok(Json(MessageResponse {
        user_message: outcome.user_message,
        assistant_message: outcome.assistant_message,
        tickets: outcome.tickets,
    }))
}

/// POST /zengpt - session-less one-shot question.
pub async fn zengpt(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    let outcome = state.orchestrator.ask(&user, &body.question_text).await?;
    Ok(Json(AskResponse {
        answer: outcome.answer,
        requirement: outcome.requirement,
    }))
}
