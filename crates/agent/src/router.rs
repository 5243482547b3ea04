//! Response strategy router: the entry point for a user turn.
//!
//! 1. establish the thread (fatal on failure)
//! 2. fetch history, documents and tools concurrently
//! 3. record the user turn
//! 4. classify the strategy and spawn generation
//!
//! The caller gets a [`TurnHandle`] as soon as generation has been spawned.

use chrono::Utc;
use std::sync::Arc;
use switchyard_config::AppConfig;
use switchyard_core::cancel::{CancellationToken, run_cancellable};
use switchyard_core::error::StoreError;
use switchyard_core::event::{DomainEvent, EventBus};
use switchyard_core::message::{Attachment, Message};
use switchyard_core::reasoning::ReasoningMode;
use switchyard_core::store::ThreadStore;
use switchyard_core::thread::{ThreadId, UserIdentity};
use switchyard_core::tool::ToolContext;
use switchyard_providers::ProviderRouter;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::crm::CrmDirectBridge;
use crate::extensions::ExtensionAggregator;
use crate::generation::{Generator, Turn};
use crate::history::{self, HistoryProfile};
use crate::model::ModelSelector;
use crate::strategy::Strategy;
use crate::stream_event::AgentStreamEvent;

/// An inbound user turn.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    /// `None` starts a new thread.
    pub thread_id: Option<ThreadId>,
    pub user: UserIdentity,
    pub message: String,
    pub attachment: Option<Attachment>,
    pub mode: ReasoningMode,
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to record user turn: {0}")]
    Storage(#[from] StoreError),

    #[error("Turn cancelled")]
    Cancelled,
}

/// A routed turn whose answer is being generated.
pub struct TurnHandle {
    pub thread_id: ThreadId,
    pub strategy: Strategy,
    pub events: mpsc::Receiver<AgentStreamEvent>,
}

impl TurnHandle {
    /// Wait for the stream to end and collect every event.
    pub async fn finish(mut self) -> CompletedTurn {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        CompletedTurn {
            thread_id: self.thread_id,
            strategy: self.strategy,
            events,
        }
    }
}

/// Every event of a finished turn.
#[derive(Debug)]
pub struct CompletedTurn {
    pub thread_id: ThreadId,
    pub strategy: Strategy,
    pub events: Vec<AgentStreamEvent>,
}

impl CompletedTurn {
    /// The streamed answer text.
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| match e {
                AgentStreamEvent::Chunk { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_done(&self) -> bool {
        matches!(self.events.last(), Some(AgentStreamEvent::Done { .. }))
    }

    pub fn error(&self) -> Option<&str> {
        self.events.iter().find_map(|e| match e {
            AgentStreamEvent::Error { message } => Some(message.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub history_limit: usize,
    pub max_document_chunks: usize,
    pub max_tokens: Option<u32>,
    pub event_buffer: usize,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            history_limit: 40,
            max_document_chunks: 6,
            max_tokens: None,
            event_buffer: 64,
        }
    }
}

impl RouterSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            history_limit: config.chat.history_limit,
            max_document_chunks: config.chat.max_document_chunks,
            max_tokens: Some(config.default_max_tokens),
            ..Self::default()
        }
    }
}

pub struct ResponseStrategyRouter {
    store: Arc<dyn ThreadStore>,
    aggregator: ExtensionAggregator,
    models: ModelSelector,
    settings: RouterSettings,
    events: Arc<EventBus>,
    generator: Arc<Generator>,
}

impl ResponseStrategyRouter {
    pub fn new(
        store: Arc<dyn ThreadStore>,
        providers: Arc<ProviderRouter>,
        aggregator: ExtensionAggregator,
        crm: CrmDirectBridge,
        models: ModelSelector,
        events: Arc<EventBus>,
    ) -> Self {
        Self::with_settings(store, providers, aggregator, crm, models, events, RouterSettings::default())
    }

    pub fn with_settings(
        store: Arc<dyn ThreadStore>,
        providers: Arc<ProviderRouter>,
        aggregator: ExtensionAggregator,
        crm: CrmDirectBridge,
        models: ModelSelector,
        events: Arc<EventBus>,
        settings: RouterSettings,
    ) -> Self {
        let generator = Arc::new(Generator {
            store: store.clone(),
            providers,
            crm: Arc::new(crm),
            bus: events.clone(),
            max_tokens: settings.max_tokens,
            max_document_chunks: settings.max_document_chunks,
        });
        Self {
            store,
            aggregator,
            models,
            settings,
            events,
            generator,
        }
    }

    /// Route one user turn.
    ///
    /// Errors are only returned before generation starts; later failures
    /// arrive as [`AgentStreamEvent::Error`] on the handle.
    pub async fn handle_turn(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> Result<TurnHandle, TurnError> {
        let text = request.message.trim();
        if text.is_empty() && request.attachment.is_none() {
            return Err(TurnError::InvalidInput("message must not be empty".into()));
        }

        let thread = match self
            .store
            .ensure_thread(request.thread_id.as_ref(), &request.user)
            .await
        {
            Ok(thread) => thread,
            Err(e) => {
                warn!(user = %request.user.id, error = %e, "Thread could not be established");
                self.events.publish(DomainEvent::ErrorOccurred {
                    context: "ensure_thread".into(),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(TurnError::Unauthorized(e.to_string()));
            }
        };

        let crm = self.aggregator.is_crm(&thread);
        let generation = request.mode.options();
        let ctx = ToolContext {
            thread_id: thread.id.clone(),
            generation: generation.clone(),
            cancel: cancel.clone(),
        };
        let profile = if crm { HistoryProfile::Crm } else { HistoryProfile::Standard };

        let history = async {
            match self.store.recent_turns(&thread.id, self.settings.history_limit).await {
                Ok(turns) => history::sanitize_storage_order(turns, profile),
                Err(e) => {
                    warn!(thread_id = %thread.id, error = %e, "History unavailable, continuing without it");
                    Vec::new()
                }
            }
        };
        let documents = async {
            match self.store.documents(&thread.id).await {
                Ok(docs) => docs,
                Err(e) => {
                    warn!(thread_id = %thread.id, error = %e, "Documents unavailable, continuing without them");
                    Vec::new()
                }
            }
        };
        let extensions = self.aggregator.collect(&thread, &ctx);
        let (history, documents, extensions) =
            run_cancellable(&cancel, async { tokio::join!(history, documents, extensions) })
                .await
                .map_err(|_| TurnError::Cancelled)?;

        let mut user_message = Message::user(text);
        if let Some(attachment) = request.attachment {
            user_message = user_message.with_attachment(attachment);
        }
        self.store.record_turn(&thread.id, &user_message).await?;

        let strategy = Strategy::classify(!user_message.attachments.is_empty(), !documents.is_empty());
        let model = self.models.select(&thread, crm);
        info!(
            thread_id = %thread.id,
            strategy = %strategy,
            crm,
            model = %model,
            mode = request.mode.as_str(),
            history = history.len(),
            "Routed turn"
        );
        self.events.publish(DomainEvent::TurnRouted {
            thread_id: thread.id.to_string(),
            strategy: strategy.as_str().into(),
            timestamp: Utc::now(),
        });

        let (tx, rx) = mpsc::channel(self.settings.event_buffer);
        let thread_id = thread.id.clone();
        let turn = Turn {
            thread,
            user: request.user,
            strategy,
            crm,
            model,
            generation,
            history,
            documents,
            extensions,
            user_message,
            cancel,
            events: tx,
        };
        tokio::spawn(self.generator.clone().run(turn));

        Ok(TurnHandle {
            thread_id,
            strategy,
            events: rx,
        })
    }
}
