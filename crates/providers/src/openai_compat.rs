//! OpenAI-compatible completion provider.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM and any endpoint exposing
//! `/chat/completions`. Supports:
//! - Non-streaming and streaming (SSE) completions
//! - Tool calling, with streamed tool-call deltas reassembled in index order
//! - Multimodal user turns (text + `image_url` content parts)
//! - A `reasoning_effort` hint for models that accept one

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use switchyard_core::error::ProviderError;
use switchyard_core::message::{Message, MessageToolCall};
use switchyard_core::provider::*;
use tracing::{debug, trace, warn};

/// An OpenAI-compatible LLM provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Convert our messages to the wire format.
    ///
    /// User turns with attachments become a content-part array; everything
    /// else is sent as a plain string.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| {
                let content = if !m.attachments.is_empty() {
                    let mut parts = vec![serde_json::json!({ "type": "text", "text": m.content })];
                    parts.extend(m.attachments.iter().map(|a| {
                        serde_json::json!({ "type": "image_url", "image_url": { "url": a.url } })
                    }));
                    Some(serde_json::Value::Array(parts))
                } else if m.content.is_empty() && !m.tool_calls.is_empty() {
                    None
                } else {
                    Some(serde_json::Value::String(m.content.clone()))
                };

                ApiMessage {
                    role: m.role.as_str().into(),
                    content,
                    tool_calls: (!m.tool_calls.is_empty()).then(|| {
                        m.tool_calls
                            .iter()
                            .map(|tc| ApiToolCall {
                                id: tc.id.clone(),
                                r#type: "function".into(),
                                function: ApiFunction {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect()
                    }),
                    tool_call_id: m.tool_call_id.clone(),
                }
            })
            .collect()
    }

    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": stream,
        });
        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(effort) = &request.reasoning_effort {
            body["reasoning_effort"] = serde_json::json!(effort);
        }
        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&request.tools));
        }
        body
    }

    async fn send(&self, body: &serde_json::Value, stream: bool) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut builder = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if stream {
            builder = builder.header("Accept", "text/event-stream");
        }

        let response = builder.json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(e.to_string())
            } else {
                ProviderError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        match status {
            200 => Ok(response),
            429 => Err(ProviderError::RateLimited { retry_after_secs: 5 }),
            401 | 403 => Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            )),
            _ => {
                let error_body = response.text().await.unwrap_or_default();
                warn!(provider = %self.name, status, body = %error_body, "Provider returned error");
                Err(ProviderError::ApiError {
                    status_code: status,
                    message: error_body,
                })
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        debug!(
            provider = %self.name,
            model = %request.model,
            tools = request.tools.len(),
            "Sending completion request"
        );
        let body = Self::request_body(&request, false);
        let response = self.send(&body, false).await?;

        let api_response: ApiResponse = response.json().await.map_err(|e| ProviderError::ApiError {
            status_code: 200,
            message: format!("Failed to parse response: {e}"),
        })?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            })?;

        let mut message = Message::assistant(choice.message.content.unwrap_or_default());
        message.tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| MessageToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(ProviderResponse {
            message,
            usage: api_response.usage.map(Usage::from),
            model: api_response.model.unwrap_or(request.model),
        })
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        debug!(provider = %self.name, model = %request.model, "Sending streaming request");
        let body = Self::request_body(&request, true);
        let response = self.send(&body, true).await?;

        let (tx, rx) = tokio::sync::mpsc::channel(64);
        let provider_name = self.name.clone();

        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut decoder = SseDecoder::new(provider_name);

            while let Some(next) = bytes.next().await {
                let chunk = match next {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(ProviderError::StreamInterrupted(e.to_string()))).await;
                        return;
                    }
                };
                for event in decoder.feed(&String::from_utf8_lossy(&chunk)) {
                    let finished = event.done;
                    if tx.send(Ok(event)).await.is_err() || finished {
                        return;
                    }
                }
            }

            // Stream ended without [DONE]
            let _ = tx.send(Ok(decoder.finish(None))).await;
        });

        Ok(rx)
    }
}

/// Incremental decoder for the `data: {...}` lines of a streamed completion.
struct SseDecoder {
    provider: String,
    buffer: String,
    tool_calls: BTreeMap<u32, ToolCallAccumulator>,
    finished: bool,
}

impl SseDecoder {
    fn new(provider: String) -> Self {
        Self {
            provider,
            buffer: String::new(),
            tool_calls: BTreeMap::new(),
            finished: false,
        }
    }

    /// Consume raw text and return the chunks completed by it. A chunk with
    /// `done == true` is always the last one returned.
    fn feed(&mut self, text: &str) -> Vec<StreamChunk> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }
        self.buffer.push_str(text);

        while let Some(line_end) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=line_end).collect();
            let line = line.trim_end_matches(['\r', '\n']);
            let Some(data) = line.strip_prefix("data:").map(str::trim) else {
                continue;
            };

            if data == "[DONE]" {
                out.push(self.finish(None));
                return out;
            }

            let parsed = match serde_json::from_str::<StreamResponse>(data) {
                Ok(p) => p,
                Err(e) => {
                    trace!(provider = %self.provider, data = %data, error = %e, "Ignoring unparseable SSE chunk");
                    continue;
                }
            };

            if let Some(choice) = parsed.choices.first() {
                for delta in choice.delta.tool_calls.iter().flatten() {
                    let acc = self.tool_calls.entry(delta.index).or_default();
                    if let Some(id) = &delta.id {
                        acc.id = id.clone();
                    }
                    if let Some(func) = &delta.function {
                        if let Some(name) = &func.name {
                            acc.name = name.clone();
                        }
                        if let Some(args) = &func.arguments {
                            acc.arguments.push_str(args);
                        }
                    }
                }
                if choice.delta.content.as_ref().is_some_and(|c| !c.is_empty()) {
                    out.push(StreamChunk {
                        content: choice.delta.content.clone(),
                        tool_calls: Vec::new(),
                        done: false,
                        usage: None,
                    });
                }
            }

            if let Some(usage) = parsed.usage {
                out.push(self.finish(Some(usage.into())));
                return out;
            }
        }
        out
    }

    /// The terminal chunk carrying reassembled tool calls.
    fn finish(&mut self, usage: Option<Usage>) -> StreamChunk {
        self.finished = true;
        StreamChunk {
            content: None,
            tool_calls: std::mem::take(&mut self.tool_calls)
                .into_values()
                .map(ToolCallAccumulator::into_tool_call)
                .collect(),
            done: true,
            usage,
        }
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default)]
    r#type: String,
    function: ApiFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<StreamToolCallDelta>>,
}

/// A tool call delta; id and name arrive once, arguments in fragments.
#[derive(Debug, Deserialize)]
struct StreamToolCallDelta {
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<StreamFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Default)]
struct ToolCallAccumulator {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    fn into_tool_call(self) -> MessageToolCall {
        MessageToolCall {
            id: self.id,
            name: self.name,
            arguments: self.arguments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::header, routing::post};
    use switchyard_core::message::Attachment;

    fn request(messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            model: "test-model".into(),
            messages,
            temperature: 0.2,
            max_tokens: Some(64),
            reasoning_effort: Some("high".into()),
            tools: vec![],
            stream: false,
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn openrouter_constructor() {
        let provider = OpenAiCompatProvider::openrouter("sk-test");
        assert_eq!(provider.name(), "openrouter");
        assert!(provider.base_url.contains("openrouter.ai"));
    }

    #[test]
    fn plain_messages_serialize_as_strings() {
        let api = OpenAiCompatProvider::to_api_messages(&[Message::system("Be brief"), Message::user("Hi")]);
        assert_eq!(api[0].role, "system");
        assert_eq!(api[1].content, Some(serde_json::json!("Hi")));
    }

    #[test]
    fn attachments_become_content_parts() {
        let msg = Message::user("What is in this picture?")
            .with_attachment(Attachment::image("https://img.example.com/cat.png"));
        let api = OpenAiCompatProvider::to_api_messages(&[msg]);
        let parts = api[0].content.as_ref().unwrap().as_array().unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0]["type"], "text");
        assert_eq!(parts[1]["type"], "image_url");
        assert_eq!(parts[1]["image_url"]["url"], "https://img.example.com/cat.png");
    }

    #[test]
    fn tool_call_turn_omits_empty_content() {
        let mut msg = Message::assistant("");
        msg.tool_calls = vec![MessageToolCall {
            id: "call_1".into(),
            name: "create_image".into(),
            arguments: r#"{"prompt":"a fox"}"#.into(),
        }];
        let api = OpenAiCompatProvider::to_api_messages(&[msg, Message::tool_result("call_1", "ok")]);
        assert!(api[0].content.is_none());
        assert_eq!(api[0].tool_calls.as_ref().unwrap()[0].function.name, "create_image");
        assert_eq!(api[1].role, "tool");
        assert_eq!(api[1].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn body_carries_reasoning_effort_and_tools() {
        let mut req = request(vec![Message::user("hi")]);
        req.tools = vec![ToolDefinition {
            name: "create_image".into(),
            description: "Generate an image".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        let body = OpenAiCompatProvider::request_body(&req, true);
        assert_eq!(body["reasoning_effort"], "high");
        assert_eq!(body["tools"][0]["function"]["name"], "create_image");
        assert_eq!(body["stream_options"]["include_usage"], true);
        assert_eq!(body["max_tokens"], 64);
    }

    #[test]
    fn decoder_reassembles_content_and_tool_calls() {
        let mut decoder = SseDecoder::new("test".into());
        let mut chunks = decoder.feed(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            ": keep-alive\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":1,\"id\":\"call_b\",\"function\":{\"name\":\"b\",\"arguments\":\"{}\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"id\":\"call_a\",\"function\":{\"name\":\"a\",\"arguments\":\"{\\\"x\\\"\"}}]}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"tool_calls\":[{\"index\":0,\"function\":{\"arguments\":\":1}\"}}]}}]}\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":3,\"completion_tokens\":2,\"total_tokens\":5}}\n",
        ));
        let last = chunks.pop().unwrap();
        let text: String = chunks.iter().filter_map(|c| c.content.clone()).collect();
        assert_eq!(text, "Hello");
        assert!(last.done);
        assert_eq!(last.usage.unwrap().total_tokens, 5);
        assert_eq!(last.tool_calls[0].id, "call_a");
        assert_eq!(last.tool_calls[0].arguments, r#"{"x":1}"#);
        assert_eq!(last.tool_calls[1].name, "b");
    }

    #[test]
    fn decoder_handles_lines_split_across_reads() {
        let mut decoder = SseDecoder::new("test".into());
        assert!(decoder.feed("data: {\"choices\":[{\"delta\":{\"con").is_empty());
        let chunks = decoder.feed("tent\":\"Hi\"}}]}\ndata: [DONE]\n");
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].content.as_deref(), Some("Hi"));
        assert!(chunks[1].done);
        assert!(decoder.feed("data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n").is_empty());
    }

    #[tokio::test]
    async fn complete_against_local_server() {
        let app = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                Json(serde_json::json!({
                    "model": body["model"],
                    "choices": [{ "message": {
                        "content": format!("effort={}", body["reasoning_effort"].as_str().unwrap_or("none")),
                    }}],
                    "usage": { "prompt_tokens": 4, "completion_tokens": 2, "total_tokens": 6 }
                }))
            }),
        );
        let base = serve(app).await;
        let provider = OpenAiCompatProvider::new("local", base, "sk-test");

        let response = provider.complete(request(vec![Message::user("hi")])).await.unwrap();
        assert_eq!(response.message.content, "effort=high");
        assert_eq!(response.model, "test-model");
        assert_eq!(response.usage.unwrap().total_tokens, 6);
    }

    #[tokio::test]
    async fn error_status_maps_to_api_error() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { (axum::http::StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let provider = OpenAiCompatProvider::new("local", serve(app).await, "sk-test");
        let err = provider.complete(request(vec![Message::user("hi")])).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 502, .. }));
    }

    #[tokio::test]
    async fn stream_against_local_server() {
        let sse = concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        let app = Router::new().route(
            "/chat/completions",
            post(move || async move { ([(header::CONTENT_TYPE, "text/event-stream")], sse) }),
        );
        let provider = OpenAiCompatProvider::new("local", serve(app).await, "sk-test");

        let mut rx = provider.stream(request(vec![Message::user("hi")])).await.unwrap();
        let mut text = String::new();
        let mut done = false;
        while let Some(chunk) = rx.recv().await {
            let chunk = chunk.unwrap();
            if let Some(c) = chunk.content {
                text.push_str(&c);
            }
            done |= chunk.done;
        }
        assert_eq!(text, "Hello world");
        assert!(done);
    }
}
