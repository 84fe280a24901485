use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use zendai_core::config::ZendeskConfig;
use zendai_core::types::{TicketRecord, ZendeskCredentials};

use crate::error::TicketError;

/// Read-only source of a user's support tickets.
#[async_trait]
pub trait TicketSource: Send + Sync {
    /// Fetch the full ticket snapshot visible to these credentials. An
    /// empty snapshot is a valid result, not an error.
    async fn fetch_tickets(
        &self,
        credentials: &ZendeskCredentials,
    ) -> Result<Vec<TicketRecord>, TicketError>;
}

/// [`TicketSource`] backed by the Zendesk request search API.
pub struct ZendeskClient {
    client: reqwest::Client,
    /// Test override; production derives the host from the subdomain.
    base_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    requests: Vec<WireTicket>,
}

#[derive(Debug, Deserialize)]
struct WireTicket {
    id: i64,
    #[serde(default)]
    assignee_id: Option<i64>,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    created_at: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    via: serde_json::Value,
}

impl From<WireTicket> for TicketRecord {
    fn from(wire: WireTicket) -> Self {
        TicketRecord {
            id: wire.id,
            assignee_id: wire.assignee_id,
            subject: wire.subject,
            description: wire.description,
            created_at: wire.created_at,
            status: wire.status,
            url: wire.url,
            via: wire.via,
        }
    }
}

impl ZendeskClient {
    pub fn new(config: &ZendeskConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(config.request_timeout_secs))
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: config.base_url.clone(),
        }
    }

    fn search_url(&self, subdomain: &str) -> String {
        match &self.base_url {
            Some(base) => format!(
                "{}/api/v2/requests/search.json",
                base.trim_end_matches('/')
            ),
            None => format!("https://{subdomain}.zendesk.com/api/v2/requests/search.json"),
        }
    }

    async fn search_once(
        &self,
        url: &str,
        credentials: &ZendeskCredentials,
    ) -> Result<Vec<TicketRecord>, TicketError> {
        let response = self
            .client
            .get(url)
            .header("Authorization", format!("Basic {}", credentials.token))
            .send()
            .await
            .map_err(|e| TicketError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TicketError::Status {
                status: status.as_u16(),
            });
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| TicketError::Malformed(e.to_string()))?;

        Ok(parsed.requests.into_iter().map(TicketRecord::from).collect())
    }
}

#[async_trait]
impl TicketSource for ZendeskClient {
    async fn fetch_tickets(
        &self,
        credentials: &ZendeskCredentials,
    ) -> Result<Vec<TicketRecord>, TicketError> {
        let url = self.search_url(&credentials.subdomain);

        // The search is an idempotent GET, so a transport failure gets one
        // immediate retry. Error statuses do not.
        match self.search_once(&url, credentials).await {
            Err(TicketError::Unavailable(first)) => {
                warn!(error = %first, "ticket search transport failure, retrying once");
                self.search_once(&url, credentials).await
            }
            other => {
                if let Ok(tickets) = &other {
                    debug!(count = tickets.len(), "fetched ticket snapshot");
                }
                other
            }
        }
    }
}
