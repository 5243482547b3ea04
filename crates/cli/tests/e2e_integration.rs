//! End-to-end integration tests for the Switchyard router.
//!
//! These tests exercise the full pipeline from a user turn to the streamed
//! answer: thread storage, strategy routing, the CRM bridge against a real
//! HTTP gateway, and the image tools with overlay memory.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::{Json, Router, routing::get};
use switchyard_agent::{
    AgentStreamEvent, CompletedTurn, CrmDirectBridge, ExtensionAggregator, ModelSelector,
    ResponseStrategyRouter, Strategy, TurnRequest,
};
use switchyard_config::CrmConfig;
use switchyard_core::cancel::CancellationToken;
use switchyard_core::crm::CrmGateway;
use switchyard_core::error::{ImageError, ProviderError};
use switchyard_core::event::EventBus;
use switchyard_core::image::{ImageComposer, ImageGenerator};
use switchyard_core::message::{Attachment, Message, MessageToolCall, Role};
use switchyard_core::overlay::{OverlayLayout, VerticalAlign};
use switchyard_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use switchyard_core::reasoning::GenerationOptions;
use switchyard_core::store::LayoutStore;
use switchyard_core::thread::{ConversationThread, DocumentChunk, ThreadId, UserIdentity};
use switchyard_memory::{
    InMemoryImageAssets, InMemoryLayoutStore, InMemoryThreadStore, StaticExtensionRegistry,
};
use switchyard_providers::{HttpCrmGateway, ProviderRouter};
use switchyard_tools::ImageToolkit;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence.
struct ScriptedProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let next = self.responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| panic!("ScriptedProvider exhausted")))
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock".into(),
    }
}

fn tool_response(name: &str, args: serde_json::Value) -> ProviderResponse {
    let mut msg = Message::assistant("");
    msg.tool_calls = vec![MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: args.to_string(),
    }];
    ProviderResponse {
        message: msg,
        usage: None,
        model: "mock".into(),
    }
}

// ── Mock image services ──────────────────────────────────────────────────

struct CountingGenerator(AtomicUsize);

#[async_trait]
impl ImageGenerator for CountingGenerator {
    async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<Vec<u8>, ImageError> {
        let n = self.0.fetch_add(1, Ordering::SeqCst);
        Ok(vec![n as u8])
    }
}

struct PassthroughComposer;

#[async_trait]
impl ImageComposer for PassthroughComposer {
    async fn compose(&self, base: &[u8], _layout: &OverlayLayout) -> Result<Vec<u8>, ImageError> {
        Ok(base.to_vec())
    }
}

// ── Harness ──────────────────────────────────────────────────────────────

const CRM: &str = "crm";

struct World {
    store: Arc<InMemoryThreadStore>,
    layouts: Arc<InMemoryLayoutStore>,
    provider: Arc<ScriptedProvider>,
    router: ResponseStrategyRouter,
}

fn world(responses: Vec<ProviderResponse>, gateway: Option<Arc<dyn CrmGateway>>) -> World {
    let store = Arc::new(InMemoryThreadStore::new());
    let layouts = Arc::new(InMemoryLayoutStore::new());
    let provider = Arc::new(ScriptedProvider::new(responses));
    let events = Arc::new(EventBus::default());

    let mut providers = ProviderRouter::new("mock");
    providers.register("mock", provider.clone());

    let toolkit = ImageToolkit::new(
        Arc::new(CountingGenerator(AtomicUsize::new(1))),
        Arc::new(InMemoryImageAssets::default()),
        layouts.clone(),
        events.clone(),
        30,
    )
    .with_composer(Arc::new(PassthroughComposer));

    let mut registry = StaticExtensionRegistry::new();
    registry.register(CRM, "Present CRM records as a table.", Vec::new());

    let router = ResponseStrategyRouter::new(
        store.clone(),
        Arc::new(providers),
        ExtensionAggregator::new(Arc::new(toolkit), Arc::new(registry), CRM),
        CrmDirectBridge::new(gateway, &CrmConfig::default(), events.clone()),
        ModelSelector::new("mock-model", None),
        events,
    );
    World { store, layouts, provider, router }
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/query")
}

fn http_gateway(url: String) -> Option<Arc<dyn CrmGateway>> {
    Some(Arc::new(HttpCrmGateway::new(url, "X-User-Email", 5)))
}

async fn crm_thread(store: &InMemoryThreadStore, id: &str) {
    let mut thread = ConversationThread::new(ThreadId::from(id));
    thread.extensions = vec![CRM.into()];
    store.insert_thread(thread).await;
}

async fn say(world: &World, thread: &str, message: &str) -> CompletedTurn {
    let request = TurnRequest {
        thread_id: Some(ThreadId::from(thread)),
        user: UserIdentity { id: "alice".into(), email: Some("alice@example.com".into()) },
        message: message.into(),
        ..Default::default()
    };
    world
        .router
        .handle_turn(request, CancellationToken::new())
        .await
        .unwrap()
        .finish()
        .await
}

fn directive(turn: &CompletedTurn) -> Option<(String, Option<u16>)> {
    turn.events.iter().find_map(|e| match e {
        AgentStreamEvent::Directive { path, status } => Some((path.clone(), *status)),
        _ => None,
    })
}

// ── E2E: routing priority ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_image_attachment_wins_over_documents_and_crm() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let url = serve(Router::new().route(
        "/query",
        get(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Json(serde_json::json!({ "records": [] })) }
        }),
    ))
    .await;

    let world = world(vec![text_response("A bar chart of Q3 deals.")], http_gateway(url));
    crm_thread(&world.store, "mixed").await;
    world
        .store
        .add_document(&ThreadId::from("mixed"), DocumentChunk { source: "q3.pdf".into(), content: "deals".into() })
        .await;

    let request = TurnRequest {
        thread_id: Some(ThreadId::from("mixed")),
        user: UserIdentity { id: "alice".into(), email: None },
        message: "show the deals in this chart".into(),
        attachment: Some(Attachment::image("https://img.example/chart.png")),
        ..Default::default()
    };
    let turn = world
        .router
        .handle_turn(request, CancellationToken::new())
        .await
        .unwrap()
        .finish()
        .await;

    assert_eq!(turn.strategy, Strategy::Multimodal);
    assert!(turn.is_done());
    assert_eq!(turn.text(), "A bar chart of Q3 deals.");
    assert!(directive(&turn).is_none());
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(world.provider.requests()[0].tools.is_empty());
}

// ── E2E: CRM direct bridge ───────────────────────────────────────────────

#[tokio::test]
async fn e2e_gateway_500_still_streams_an_answer() {
    let url = serve(Router::new().route(
        "/query",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "database exploded") }),
    ))
    .await;
    let world = world(
        vec![text_response("I could not reach the CRM. Please contact your administrator.")],
        http_gateway(url),
    );
    crm_thread(&world.store, "crm").await;

    let turn = say(&world, "crm", "今月の商談一覧を見せて").await;

    assert!(turn.is_done());
    assert_eq!(directive(&turn), Some(("gateway_error".to_string(), Some(500))));
    assert!(turn.text().contains("administrator"));

    let sent = &world.provider.requests()[0];
    let notice = sent.messages.last().unwrap();
    assert_eq!(notice.role, Role::System);
    assert!(notice.content.contains("HTTP 500"));
    assert!(!notice.content.contains("database exploded"));
}

#[tokio::test]
async fn e2e_gateway_data_is_injected_once_then_stripped_from_history() {
    let url = serve(Router::new().route(
        "/query",
        get(|| async {
            Json(serde_json::json!({
                "records": [{ "name": "Acme renewal", "status": "Negotiation", "amount": 120000 }]
            }))
        }),
    ))
    .await;
    let world = world(
        vec![
            text_response("| No. | Name | Status |\n| 1 | Acme renewal | Negotiation |"),
            text_response("It is waiting on legal review."),
        ],
        http_gateway(url),
    );
    crm_thread(&world.store, "crm").await;

    let first = say(&world, "crm", "show open deals").await;
    assert_eq!(directive(&first), Some(("gateway_query".to_string(), None)));

    let second = say(&world, "crm", "why is that?").await;
    assert_eq!(directive(&second), Some(("context_only".to_string(), None)));

    let requests = world.provider.requests();
    assert!(requests[0].messages.last().unwrap().content.contains("```json"));
    assert!(requests[0].messages.last().unwrap().content.contains("Acme renewal"));

    // The earlier gateway payload is not replayed; the table answer is
    let replayed: Vec<&str> = requests[1].messages.iter().map(|m| m.content.as_str()).collect();
    assert!(!replayed.iter().any(|c| c.contains("```json")));
    assert!(replayed.iter().any(|c| c.contains("Acme renewal")));
}

// ── E2E: image tools and overlay memory ──────────────────────────────────

#[tokio::test]
async fn e2e_new_base_image_resets_overlay_style() {
    let world = world(
        vec![
            tool_response("create_image", serde_json::json!({ "prompt": "a beach at sunset" })),
            text_response("Here is your beach."),
            tool_response(
                "edit_image_text",
                serde_json::json!({ "text": "SALE", "instruction": "at the top", "position": "top" }),
            ),
            text_response("Added SALE at the top."),
            tool_response("create_image", serde_json::json!({ "prompt": "a mountain lake" })),
            text_response("Here is your lake."),
            tool_response("edit_image_text", serde_json::json!({ "text": "Hi", "instruction": "" })),
            text_response("Added Hi."),
        ],
        None,
    );
    let thread = ThreadId::from("poster");

    let turn = say(&world, "poster", "draw a beach").await;
    assert!(turn.is_done());
    assert!(world.layouts.get(&thread).await.is_none());

    let turn = say(&world, "poster", "write SALE at the top").await;
    assert!(turn.events.iter().any(|e| matches!(
        e,
        AgentStreamEvent::ToolResult { name, success: true, .. } if name == "edit_image_text"
    )));
    let styled = world.layouts.get(&thread).await.unwrap();
    assert_eq!(styled.text, "SALE");
    assert_eq!(styled.v_align, VerticalAlign::Top);

    say(&world, "poster", "now a mountain lake instead").await;
    assert!(world.layouts.get(&thread).await.is_none());

    say(&world, "poster", "write Hi on it").await;
    assert_eq!(world.layouts.get(&thread).await.unwrap(), OverlayLayout::with_text("Hi"));
}
