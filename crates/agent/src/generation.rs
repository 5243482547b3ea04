//! Answer generation for a routed turn.
//!
//! Runs as a spawned task per turn and reports through the turn's event
//! channel. A closed channel (client gone) does not stop generation, so the
//! transcript still receives the answer.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use switchyard_core::cancel::{CancellationToken, Cancelled, run_cancellable};
use switchyard_core::error::{ProviderError, ToolError};
use switchyard_core::event::{DomainEvent, EventBus};
use switchyard_core::message::Message;
use switchyard_core::provider::{Provider, ProviderRequest, ToolDefinition, Usage};
use switchyard_core::reasoning::GenerationOptions;
use switchyard_core::store::ThreadStore;
use switchyard_core::thread::{ConversationThread, DocumentChunk, UserIdentity};
use switchyard_core::tool::ToolCall;
use switchyard_providers::ProviderRouter;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::crm::{CrmDirectBridge, CrmPath};
use crate::documents;
use crate::extensions::ExtensionSet;
use crate::strategy::Strategy;
use crate::stream_event::AgentStreamEvent;

const DEFAULT_PERSONA: &str = "You are a helpful assistant. Reply in the language the user writes in.";

/// Everything a routed turn needs to be answered.
pub(crate) struct Turn {
    pub thread: ConversationThread,
    pub user: UserIdentity,
    pub strategy: Strategy,
    pub crm: bool,
    pub model: String,
    pub generation: GenerationOptions,
    pub history: Vec<Message>,
    pub documents: Vec<DocumentChunk>,
    pub extensions: ExtensionSet,
    pub user_message: Message,
    pub cancel: CancellationToken,
    pub events: mpsc::Sender<AgentStreamEvent>,
}

impl Turn {
    async fn emit(&self, event: AgentStreamEvent) {
        // Receiver dropped means nobody is listening any more
        let _ = self.events.send(event).await;
    }
}

/// Why generation stopped early.
#[derive(Debug)]
enum Stop {
    Cancelled,
    Provider(ProviderError),
}

impl From<Cancelled> for Stop {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<ProviderError> for Stop {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}

struct Answer {
    text: String,
    usage: Option<Usage>,
    tool_calls_made: usize,
}

/// Shared services used by generation tasks.
pub(crate) struct Generator {
    pub store: Arc<dyn ThreadStore>,
    pub providers: Arc<ProviderRouter>,
    pub crm: Arc<CrmDirectBridge>,
    pub bus: Arc<EventBus>,
    pub max_tokens: Option<u32>,
    pub max_document_chunks: usize,
}

impl Generator {
    pub async fn run(self: Arc<Self>, turn: Turn) {
        let outcome = match turn.strategy {
            Strategy::Multimodal | Strategy::ChatWithFile => self.answer_plain(&turn, &[]).await,
            Strategy::Extensions if turn.crm => self.answer_crm(&turn).await,
            Strategy::Extensions => self.answer_with_tools(&turn).await,
        };

        match outcome {
            Ok(answer) => {
                self.record(&turn, &Message::assistant(&answer.text)).await;
                self.bus.publish(DomainEvent::ResponseGenerated {
                    thread_id: turn.thread.id.to_string(),
                    model: turn.model.clone(),
                    tokens_used: answer.usage.as_ref().map_or(0, |u| u.total_tokens),
                    timestamp: Utc::now(),
                });
                info!(
                    thread_id = %turn.thread.id,
                    strategy = %turn.strategy,
                    model = %turn.model,
                    tool_calls = answer.tool_calls_made,
                    "Turn answered"
                );
                turn.emit(AgentStreamEvent::Done {
                    thread_id: turn.thread.id.to_string(),
                    strategy: turn.strategy.as_str().into(),
                    model: turn.model.clone(),
                    usage: answer.usage,
                    tool_calls_made: answer.tool_calls_made,
                })
                .await;
            }
            Err(Stop::Cancelled) => {
                info!(thread_id = %turn.thread.id, "Turn cancelled");
                turn.emit(AgentStreamEvent::Error { message: "Turn cancelled".into() }).await;
            }
            Err(Stop::Provider(e)) => {
                warn!(thread_id = %turn.thread.id, model = %turn.model, error = %e, "Generation failed");
                self.bus.publish(DomainEvent::ErrorOccurred {
                    context: format!("generation:{}", turn.strategy),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                turn.emit(AgentStreamEvent::Error { message: e.to_string() }).await;
            }
        }
    }

    /// CRM threads: inject the bridge's directive, then answer without tools.
    async fn answer_crm(&self, turn: &Turn) -> Result<Answer, Stop> {
        let directive = self
            .crm
            .prepare(&turn.thread.id, &turn.user, &turn.user_message.content, &turn.cancel)
            .await?;

        let status = match &directive.path {
            CrmPath::GatewayQuery { status, .. } => *status,
            CrmPath::ContextOnly => None,
        };
        turn.emit(AgentStreamEvent::Directive {
            path: directive.path.as_str().into(),
            status,
        })
        .await;

        let injected = Message::system(&directive.content);
        if directive.path != CrmPath::ContextOnly {
            self.record(turn, &injected).await;
        }
        self.answer_plain(turn, &[injected]).await
    }

    /// Offer the collected tools once, run whatever the model picks, then
    /// stream the final answer without tools.
    async fn answer_with_tools(&self, turn: &Turn) -> Result<Answer, Stop> {
        if turn.extensions.tools.is_empty() {
            return self.answer_plain(turn, &[]).await;
        }

        let (provider, model) = self.provider(turn)?;
        let request = self.request(turn, model, self.messages(turn, &[]), turn.extensions.tools.definitions(), false);
        let response = run_cancellable(&turn.cancel, provider.complete(request)).await??;

        if response.message.tool_calls.is_empty() {
            let text = response.message.content;
            if !text.is_empty() {
                turn.emit(AgentStreamEvent::Chunk { content: text.clone() }).await;
            }
            return Ok(Answer { text, usage: response.usage, tool_calls_made: 0 });
        }

        let assistant = response.message;
        self.record(turn, &assistant).await;
        debug!(
            thread_id = %turn.thread.id,
            tool_count = assistant.tool_calls.len(),
            "Executing tool calls"
        );

        let mut exchange = vec![assistant.clone()];
        for tc in &assistant.tool_calls {
            let parsed = parse_arguments(&tc.arguments);
            let call = ToolCall {
                id: tc.id.clone(),
                name: tc.name.clone(),
                arguments: parsed
                    .as_ref()
                    .map_or_else(|_| serde_json::Value::String(tc.arguments.clone()), Clone::clone),
            };
            turn.emit(AgentStreamEvent::ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                input: call.arguments.clone(),
            })
            .await;

            let start = Instant::now();
            let result = match parsed {
                Ok(_) => run_cancellable(&turn.cancel, turn.extensions.tools.execute(&call)).await?,
                Err(e) => Err(e),
            };
            let duration_ms = start.elapsed().as_millis() as u64;

            let (output, success) = match result {
                Ok(r) => (r.output, r.success),
                Err(ToolError::Cancelled(_)) => return Err(Stop::Cancelled),
                Err(e) => {
                    warn!(tool = %tc.name, error = %e, "Tool execution failed");
                    (serde_json::json!({ "error": e.to_string() }).to_string(), false)
                }
            };
            self.bus.publish(DomainEvent::ToolExecuted {
                tool_name: tc.name.clone(),
                success,
                duration_ms,
                timestamp: Utc::now(),
            });
            turn.emit(AgentStreamEvent::ToolResult {
                id: tc.id.clone(),
                name: tc.name.clone(),
                output: output.clone(),
                success,
            })
            .await;

            let tool_message = Message::tool_result(&tc.id, output);
            self.record(turn, &tool_message).await;
            exchange.push(tool_message);
        }

        let mut answer = self.answer_plain(turn, &exchange).await?;
        answer.tool_calls_made = assistant.tool_calls.len();
        Ok(answer)
    }

    /// Stream an answer with no tools offered.
    async fn answer_plain(&self, turn: &Turn, tail: &[Message]) -> Result<Answer, Stop> {
        let (provider, model) = self.provider(turn)?;
        let request = self.request(turn, model, self.messages(turn, tail), Vec::new(), true);
        let mut rx = run_cancellable(&turn.cancel, provider.stream(request)).await??;

        let mut text = String::new();
        let mut usage = None;
        while let Some(next) = run_cancellable(&turn.cancel, rx.recv()).await? {
            let chunk = next?;
            if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                text.push_str(&content);
                turn.emit(AgentStreamEvent::Chunk { content }).await;
            }
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
            if chunk.done {
                break;
            }
        }
        Ok(Answer { text, usage, tool_calls_made: 0 })
    }

    fn provider(&self, turn: &Turn) -> Result<(Arc<dyn Provider>, String), Stop> {
        self.providers
            .resolve(&turn.model)
            .ok_or_else(|| Stop::Provider(ProviderError::NotConfigured(turn.model.clone())))
    }

    fn request(
        &self,
        turn: &Turn,
        model: String,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        stream: bool,
    ) -> ProviderRequest {
        ProviderRequest {
            model,
            messages,
            temperature: turn.generation.temperature,
            max_tokens: self.max_tokens,
            reasoning_effort: Some(turn.generation.reasoning_effort.clone()),
            tools,
            stream,
        }
    }

    /// System instruction, sanitized history, the user turn, then `tail`.
    fn messages(&self, turn: &Turn, tail: &[Message]) -> Vec<Message> {
        let mut messages = Vec::with_capacity(turn.history.len() + tail.len() + 2);
        messages.push(Message::system(self.system_instruction(turn)));
        messages.extend(turn.history.iter().cloned());
        messages.push(turn.user_message.clone());
        messages.extend(tail.iter().cloned());
        messages
    }

    fn system_instruction(&self, turn: &Turn) -> String {
        let persona = turn.thread.persona.trim();
        let mut sections = vec![if persona.is_empty() { DEFAULT_PERSONA.to_string() } else { persona.to_string() }];
        if let Some(steps) = turn.extensions.steps_section() {
            sections.push(steps);
        }
        if turn.strategy == Strategy::ChatWithFile {
            let picked = documents::select_chunks(&turn.documents, &turn.user_message.content, self.max_document_chunks);
            if !picked.is_empty() {
                sections.push(documents::context_section(&picked));
            }
        }
        sections.join("\n\n")
    }

    async fn record(&self, turn: &Turn, message: &Message) {
        if let Err(e) = self.store.record_turn(&turn.thread.id, message).await {
            warn!(thread_id = %turn.thread.id, role = message.role.as_str(), error = %e, "Failed to record turn");
        }
    }
}

/// Decode a model-supplied argument string. Some providers send an empty
/// string for argument-less calls.
fn parse_arguments(raw: &str) -> Result<serde_json::Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    serde_json::from_str(raw).map_err(|e| ToolError::InvalidArguments(format!("Malformed JSON arguments: {e}")))
}
