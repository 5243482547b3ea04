//! `switchyard chat` — Single-message or interactive chat through the router.

use std::io::Write;
use std::sync::Arc;
use switchyard_agent::{
    AgentStreamEvent, CrmDirectBridge, ExtensionAggregator, ModelSelector, ResponseStrategyRouter,
    RouterSettings, TurnRequest,
};
use switchyard_config::AppConfig;
use switchyard_core::cancel::CancellationToken;
use switchyard_core::crm::CrmGateway;
use switchyard_core::event::EventBus;
use switchyard_core::message::Attachment;
use switchyard_core::reasoning::ReasoningMode;
use switchyard_core::store::ThreadStore;
use switchyard_core::thread::{ConversationThread, ThreadId, UserIdentity};
use switchyard_memory::{
    FileThreadStore, InMemoryImageAssets, InMemoryLayoutStore, InMemoryThreadStore,
    StaticExtensionRegistry,
};
use switchyard_providers::{HttpCrmGateway, HttpImageComposer, OpenAiImageGenerator};
use switchyard_tools::ImageToolkit;
use tokio::io::{AsyncBufReadExt, BufReader};

const CRM_EXECUTION_STEPS: &str = "Answer CRM questions from the data provided in the conversation. \
Present record lists as a table with the columns No., Name, Status, Amount, Owner, Updated and Link. \
Never invent records that are not in the data.";

pub struct ChatOptions {
    pub thread: Option<String>,
    pub mode: String,
    pub image: Option<String>,
    pub extensions: Vec<String>,
    pub ephemeral: bool,
    pub user: String,
    pub email: Option<String>,
}

pub async fn run(message: Option<String>, options: ChatOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early so the error is clear
    if !config.has_api_key() && config.providers.values().all(|p| p.api_key.is_none()) {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    SWITCHYARD_API_KEY=sk-...        (generic)");
        eprintln!("    OPENROUTER_API_KEY=sk-or-v1-...  (OpenRouter)");
        eprintln!("    OPENAI_API_KEY=sk-...            (OpenAI direct)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let user = UserIdentity {
        id: options.user.clone(),
        email: options.email.clone(),
    };
    let thread_id = options.thread.as_deref().map(ThreadId::from).unwrap_or_default();
    let store = open_store(&options, &thread_id, &user).await?;
    let router = build_router(&config, store);
    let mode = ReasoningMode::parse(&options.mode);

    if let Some(msg) = message {
        let request = TurnRequest {
            thread_id: Some(thread_id.clone()),
            user,
            message: msg,
            attachment: options.image.map(Attachment::image),
            mode,
        };
        send(&router, request).await?;
        eprintln!("  thread: {thread_id}");
        return Ok(());
    }

    // Interactive mode
    println!();
    println!("  Switchyard — Interactive Mode");
    println!();
    println!("  Provider:   {}", config.default_provider);
    println!("  Model:      {}", config.default_model);
    println!("  Mode:       {}", mode.as_str());
    println!("  Thread:     {thread_id}");
    if !options.extensions.is_empty() {
        println!("  Extensions: {}", options.extensions.join(", "));
    }
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut attachment = options.image.map(Attachment::image);
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        let request = TurnRequest {
            thread_id: Some(thread_id.clone()),
            user: user.clone(),
            message: line.to_string(),
            // The image only goes with the first message
            attachment: attachment.take(),
            mode,
        };
        println!();
        if let Err(e) = send(&router, request).await {
            eprintln!("  [Error] {e}");
        }
        println!();
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

/// Open the thread store and apply `--extension` flags to the thread.
async fn open_store(
    options: &ChatOptions,
    thread_id: &ThreadId,
    user: &UserIdentity,
) -> Result<Arc<dyn ThreadStore>, Box<dyn std::error::Error>> {
    if options.ephemeral {
        let store = InMemoryThreadStore::new();
        let mut thread = ConversationThread::new(thread_id.clone());
        thread.owner = Some(user.clone());
        thread.extensions = options.extensions.clone();
        store.insert_thread(thread).await;
        return Ok(Arc::new(store));
    }

    let store = FileThreadStore::new(FileThreadStore::default_dir());
    if !options.extensions.is_empty() {
        let extensions = options.extensions.clone();
        store
            .update_thread(thread_id, user, move |thread| {
                for ext in extensions {
                    if !thread.has_extension(&ext) {
                        thread.extensions.push(ext);
                    }
                }
            })
            .await?;
    }
    Ok(Arc::new(store))
}

/// Wire the router from configuration.
fn build_router(config: &AppConfig, store: Arc<dyn ThreadStore>) -> ResponseStrategyRouter {
    let events = Arc::new(EventBus::default());
    let providers = Arc::new(switchyard_providers::build_from_config(config));

    let api_key = config.api_key.clone().unwrap_or_default();
    let mut toolkit = ImageToolkit::new(
        Arc::new(OpenAiImageGenerator::from_config(&config.images, api_key)),
        Arc::new(InMemoryImageAssets::default()),
        Arc::new(InMemoryLayoutStore::new()),
        events.clone(),
        config.images.timeout_secs,
    );
    if let Some(url) = &config.images.composer_url {
        toolkit = toolkit.with_composer(Arc::new(HttpImageComposer::new(url, config.images.timeout_secs)));
    }

    let mut registry = StaticExtensionRegistry::new();
    registry.register(&config.crm.extension_id, CRM_EXECUTION_STEPS, Vec::new());

    let gateway = HttpCrmGateway::from_config(&config.crm).map(|g| Arc::new(g) as Arc<dyn CrmGateway>);

    ResponseStrategyRouter::with_settings(
        store,
        providers,
        ExtensionAggregator::new(Arc::new(toolkit), Arc::new(registry), &config.crm.extension_id),
        CrmDirectBridge::new(gateway, &config.crm, events.clone()),
        ModelSelector::from_config(config),
        events,
        RouterSettings::from_config(config),
    )
}

/// Route one turn and print its stream. Ctrl+C cancels the turn.
async fn send(router: &ResponseStrategyRouter, request: TurnRequest) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let guard = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            guard.cancel();
        }
    });

    let mut handle = router.handle_turn(request, cancel).await?;
    let mut failure = None;
    while let Some(event) = handle.events.recv().await {
        match event {
            AgentStreamEvent::Chunk { content } => {
                print!("{content}");
                std::io::stdout().flush()?;
            }
            AgentStreamEvent::ToolCall { name, .. } => eprintln!("  [tool] {name}"),
            AgentStreamEvent::ToolResult { name, success, .. } => {
                eprintln!("  [tool] {name} {}", if success { "ok" } else { "failed" });
            }
            AgentStreamEvent::Directive { path, status } => match status {
                Some(status) => eprintln!("  [crm] {path} (HTTP {status})"),
                None => eprintln!("  [crm] {path}"),
            },
            AgentStreamEvent::Done { strategy, model, usage, .. } => {
                println!();
                let tokens = usage.map_or(0, |u| u.total_tokens);
                tracing::debug!(%strategy, %model, tokens, "Turn complete");
            }
            AgentStreamEvent::Error { message } => failure = Some(message),
        }
    }
    ctrl_c.abort();

    match failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}
