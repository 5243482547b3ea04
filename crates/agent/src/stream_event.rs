//! Turn-level streaming events.
//!
//! `AgentStreamEvent` wraps provider-level stream chunks and the router's
//! own decisions into events a client can render as they arrive.

use serde::{Deserialize, Serialize};
use switchyard_core::provider::Usage;

/// Events emitted while a turn is generated.
///
/// - `chunk`       — partial text from the model
/// - `tool_call`   — a tool is being invoked
/// - `tool_result` — tool execution completed
/// - `directive`   — the CRM bridge chose a sub-path
/// - `done`        — stream is complete
/// - `error`       — generation stopped early
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentStreamEvent {
    /// Partial text from the model.
    Chunk { content: String },

    /// A tool is being called.
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Tool execution completed.
    ToolResult {
        id: String,
        name: String,
        output: String,
        success: bool,
    },

    /// The CRM bridge injected a directive (`context_only`,
    /// `gateway_query` or `gateway_error`).
    Directive {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },

    /// The stream is complete.
    Done {
        thread_id: String,
        strategy: String,
        model: String,
        usage: Option<Usage>,
        tool_calls_made: usize,
    },

    /// Generation stopped early.
    Error { message: String },
}

impl AgentStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::ToolCall { .. } => "tool_call",
            Self::ToolResult { .. } => "tool_result",
            Self::Directive { .. } => "directive",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }
}
