//! API error types and JSON error response formatting.
//!
//! ApiError provides a consistent JSON error response format across all
//! endpoints, mapping internal errors to appropriate HTTP status codes.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use zendai_chat::ChatError;
use zendai_core::error::ZendaiError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "not_found").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid parameters.
    BadRequest(String),
    /// 401 Unauthorized - bad credentials or missing/invalid token.
    Unauthorized(String),
    /// 404 Not Found - resource does not exist or is not yours.
    NotFound(String),
    /// 409 Conflict - username or email already taken.
    Conflict(String),
    /// 412 Precondition Failed - Zendesk credentials not configured.
    PreconditionFailed(String),
    /// 500 Internal Server Error - unexpected server error.
    Internal(String),
    /// 502 Bad Gateway - an upstream dependency failed.
    BadGateway(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::PreconditionFailed(msg) => {
                (StatusCode::PRECONDITION_FAILED, "precondition_failed", msg)
            }
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, "bad_gateway", msg),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                header::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}

impl From<ZendaiError> for ApiError {
    fn from(err: ZendaiError) -> Self {
        match &err {
            ZendaiError::Unauthorized => ApiError::Unauthorized(err.to_string()),
            ZendaiError::Conflict(_) => ApiError::Conflict(err.to_string()),
            ZendaiError::NotFound => ApiError::NotFound("NOT_FOUND".to_string()),
            ZendaiError::CredentialsMissing => ApiError::PreconditionFailed(err.to_string()),
            ZendaiError::InvalidInput(msg) | ZendaiError::BadRequest(msg) => {
                ApiError::BadRequest(msg.clone())
            }
            ZendaiError::UpstreamUnavailable(msg)
            | ZendaiError::MalformedUpstream(msg)
            | ZendaiError::ExtractionParse(msg)
            | ZendaiError::Generation(msg) => ApiError::BadGateway(msg.clone()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        ApiError::from(ZendaiError::from(err))
    }
}
