//! CRM natural-language query gateway.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::GatewayError;

/// One query against the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayQuery {
    /// The user's message, passed through verbatim
    pub query: String,

    /// Engine selector
    pub engine: String,

    /// Mode selector
    pub mode: String,

    /// Identity used by the gateway to scope results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
}

/// The gateway answers with free-form JSON; records expose at least a link.
#[async_trait]
pub trait CrmGateway: Send + Sync {
    async fn query(&self, query: &GatewayQuery) -> Result<serde_json::Value, GatewayError>;
}
