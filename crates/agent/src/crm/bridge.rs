//! CRM direct bridge: the extensions strategy's fast path for CRM threads.
//!
//! Generic tool orchestration is skipped. The bridge either tells the model
//! to answer from context, or queries the gateway itself and injects the
//! result (or an explanation of the failure) as a system directive. Exactly
//! one of those happens per turn.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use switchyard_config::CrmConfig;
use switchyard_core::cancel::{CancellationToken, Cancelled, run_cancellable};
use switchyard_core::crm::{CrmGateway, GatewayQuery};
use switchyard_core::error::GatewayError;
use switchyard_core::event::{DomainEvent, EventBus};
use switchyard_core::thread::{ThreadId, UserIdentity};
use tracing::{info, warn};

use super::classifier::{self, Intent};
use super::directive::{self, Language};

/// Which sub-path the bridge took.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum CrmPath {
    ContextOnly,
    GatewayQuery {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
}

impl CrmPath {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContextOnly => "context_only",
            Self::GatewayQuery { success: true, .. } => "gateway_query",
            Self::GatewayQuery { success: false, .. } => "gateway_error",
        }
    }
}

/// The system directive to inject for this turn.
#[derive(Debug, Clone)]
pub struct CrmDirective {
    pub path: CrmPath,
    pub content: String,
}

pub struct CrmDirectBridge {
    gateway: Option<Arc<dyn CrmGateway>>,
    engine: String,
    mode: String,
    max_result_chars: usize,
    events: Arc<EventBus>,
}

impl CrmDirectBridge {
    pub fn new(gateway: Option<Arc<dyn CrmGateway>>, config: &CrmConfig, events: Arc<EventBus>) -> Self {
        Self {
            gateway,
            engine: config.engine.clone(),
            mode: config.mode.clone(),
            max_result_chars: config.max_result_chars,
            events,
        }
    }

    /// Build the directive for `message`.
    ///
    /// Only cancellation is an error; gateway failures become failure
    /// directives.
    pub async fn prepare(
        &self,
        thread_id: &ThreadId,
        user: &UserIdentity,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<CrmDirective, Cancelled> {
        let language = Language::detect(message);

        if classifier::classify(message) == Intent::FollowUp {
            info!(
                thread_id = %thread_id,
                rule = classifier::matched_rule(message).unwrap_or("default"),
                "CRM follow-up, answering from context"
            );
            return Ok(CrmDirective {
                path: CrmPath::ContextOnly,
                content: directive::follow_up(language),
            });
        }

        let query = GatewayQuery {
            query: message.to_string(),
            engine: self.engine.clone(),
            mode: self.mode.clone(),
            user_email: user.email.clone(),
        };
        let outcome = match &self.gateway {
            Some(gateway) => run_cancellable(cancel, gateway.query(&query)).await?,
            None => Err(GatewayError::NotConfigured),
        };

        let (path, content) = match outcome {
            Ok(result) => {
                info!(thread_id = %thread_id, engine = %self.engine, "CRM gateway answered");
                (
                    CrmPath::GatewayQuery { success: true, status: None },
                    directive::gateway_success(language, &result, self.max_result_chars),
                )
            }
            Err(e) => {
                let status = match &e {
                    GatewayError::Status { status, .. } => Some(*status),
                    _ => None,
                };
                warn!(thread_id = %thread_id, error = %e, "CRM gateway query failed");
                (
                    CrmPath::GatewayQuery { success: false, status },
                    directive::gateway_failure(language, &e),
                )
            }
        };

        if let CrmPath::GatewayQuery { success, status } = &path {
            self.events.publish(DomainEvent::GatewayQueried {
                thread_id: thread_id.to_string(),
                success: *success,
                status: *status,
                timestamp: Utc::now(),
            });
        }

        Ok(CrmDirective { path, content })
    }
}
