//! Application binary - composition root.
//!
//! Ties the crates together into a single executable:
//! 1. Parse CLI arguments and load configuration from TOML
//! 2. Open SQLite storage and run migrations
//! 3. Build the OpenAI-compatible completion provider and the Zendesk
//!    ticket client
//! 4. Start the axum REST API server

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use zendai_api::{routes, AppState};
use zendai_core::config::ZendaiConfig;
use zendai_llm::{CompletionProvider, OpenAiProvider};
use zendai_storage::Database;
use zendai_zendesk::{TicketSource, ZendeskClient};

mod cli;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if let Some(rest) = data_dir.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(data_dir)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();

    // Config, with CLI overrides folded in.
    let config_file = args.resolve_config_path();
    let mut config = ZendaiConfig::load_or_default(&config_file);
    config.general.port = args.resolve_port(config.general.port);
    if let Some(data_dir) = args.resolve_data_dir() {
        config.general.data_dir = data_dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.general.log_level.clone())),
        )
        .init();

    tracing::info!("Starting ZendAI v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    if config.auth.secret_key == "change-me" {
        tracing::warn!("auth.secret_key is still the default; set it before exposing this server");
    }

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }

    let db_path = data_dir.join("zendai.db");
    let database = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // Outbound clients.
    let llm: Arc<dyn CompletionProvider> = Arc::new(OpenAiProvider::new(&config.llm));
    let tickets: Arc<dyn TicketSource> = Arc::new(ZendeskClient::new(&config.zendesk));
    if config.llm.api_key.trim().is_empty() {
        tracing::warn!("llm.api_key is unset; chat endpoints will fail until it is configured");
    }

    let state = AppState::new(config, database, tickets, llm);

    routes::start_server(state).await?;

    Ok(())
}
