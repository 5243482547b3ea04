//! HTTP client for the CRM natural-language query gateway.
//!
//! `GET {gateway_url}?q=<message>&engine=<engine>&mode=<mode>`, with the
//! caller's email in a configurable header so the gateway can scope results.
//! No retries: one failed attempt is reported back as a [`GatewayError`].

use async_trait::async_trait;
use std::time::Duration;
use switchyard_core::crm::{CrmGateway, GatewayQuery};
use switchyard_core::error::GatewayError;
use tracing::{debug, warn};

pub struct HttpCrmGateway {
    url: String,
    user_header: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl HttpCrmGateway {
    pub fn new(url: impl Into<String>, user_header: impl Into<String>, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            url: url.into(),
            user_header: user_header.into(),
            timeout_secs,
            client,
        }
    }

    /// Build from the `[crm]` config section; `None` when no gateway URL is set.
    pub fn from_config(config: &switchyard_config::CrmConfig) -> Option<Self> {
        config
            .gateway_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(|url| Self::new(url, &config.user_header, config.timeout_secs))
    }
}

#[async_trait]
impl CrmGateway for HttpCrmGateway {
    async fn query(&self, query: &GatewayQuery) -> Result<serde_json::Value, GatewayError> {
        debug!(url = %self.url, engine = %query.engine, mode = %query.mode, "Querying CRM gateway");

        let mut request = self.client.get(&self.url).query(&[
            ("q", query.query.as_str()),
            ("engine", query.engine.as_str()),
            ("mode", query.mode.as_str()),
        ]);
        if let Some(email) = &query.user_email {
            request = request.header(self.user_header.as_str(), email);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(self.timeout_secs)
            } else {
                GatewayError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "CRM gateway returned an error status");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| GatewayError::Parse(e.to_string()))
    }
}
