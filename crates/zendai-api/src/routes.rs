//! Router setup with all API routes and middleware.
//!
//! Configures the axum Router with CORS, tracing, compression, and all
//! endpoint handlers, splitting public routes from those behind auth.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Registration and login are reachable without a token.
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/token", post(handlers::token));

    let protected_routes = Router::new()
        .route(
            "/users/me",
            get(handlers::me).patch(handlers::update_credentials),
        )
        .route(
            "/chats",
            get(handlers::list_chats).post(handlers::create_chat),
        )
        .route("/chats/{id}", get(handlers::get_chat))
        .route("/chats/{id}/messages", post(handlers::post_message))
        .route("/zengpt", post(handlers::zengpt))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::auth::require_auth,
        ));

    public_routes
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(64 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server on the configured port, bound to localhost.
pub async fn start_server(state: AppState) -> Result<(), zendai_core::error::ZendaiError> {
    let port = state.config.general.port;
    let addr = format!("127.0.0.1:{}", port);

    let router = create_router(state);

    tracing::info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| zendai_core::error::ZendaiError::Api(format!("Failed to bind: {}", e)))?;

    axum::serve(listener, router)
        .await
        .map_err(|e| zendai_core::error::ZendaiError::Api(format!("Server error: {}", e)))?;

    Ok(())
}
