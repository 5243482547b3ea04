//! Extension aggregator — collects the tools offered to the model for a turn.

use futures::future::join_all;
use std::sync::Arc;
use switchyard_core::extension::{DefaultToolSource, ExtensionDescriptor, ExtensionRegistry};
use switchyard_core::thread::ConversationThread;
use switchyard_core::tool::{ToolContext, ToolRegistry};
use tracing::{debug, warn};

/// Execution-steps text of one enabled extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionSteps {
    pub id: String,
    pub steps: String,
}

/// Everything the aggregator found for a turn.
#[derive(Clone, Default)]
pub struct ExtensionSet {
    pub tools: ToolRegistry,
    pub steps: Vec<ExtensionSteps>,
}

impl ExtensionSet {
    /// The "Extension steps" section appended to the system instruction.
    pub fn steps_section(&self) -> Option<String> {
        let blocks: Vec<String> = self
            .steps
            .iter()
            .filter(|s| !s.steps.trim().is_empty())
            .map(|s| format!("### {}\n{}", s.id, s.steps.trim()))
            .collect();
        if blocks.is_empty() {
            return None;
        }
        Some(format!("## Extension steps\n\n{}", blocks.join("\n\n")))
    }
}

pub struct ExtensionAggregator {
    defaults: Arc<dyn DefaultToolSource>,
    registry: Arc<dyn ExtensionRegistry>,
    crm_extension_id: String,
}

impl ExtensionAggregator {
    pub fn new(
        defaults: Arc<dyn DefaultToolSource>,
        registry: Arc<dyn ExtensionRegistry>,
        crm_extension_id: impl Into<String>,
    ) -> Self {
        Self {
            defaults,
            registry,
            crm_extension_id: crm_extension_id.into(),
        }
    }

    pub fn is_crm(&self, thread: &ConversationThread) -> bool {
        thread.has_extension(&self.crm_extension_id)
    }

    /// Collect tools for `thread`. `ctx.generation` carries the turn's
    /// reasoning preset into the built-in tools.
    ///
    /// CRM threads skip the built-in tools. A failing source is logged and
    /// the turn continues with whatever the other sources returned.
    pub async fn collect(&self, thread: &ConversationThread, ctx: &ToolContext) -> ExtensionSet {
        let crm = self.is_crm(thread);
        let defaults = async {
            if crm {
                return Vec::new();
            }
            match self.defaults.default_tools(ctx).await {
                Ok(tools) => tools,
                Err(e) => {
                    warn!(thread_id = %thread.id, error = %e, "Default tools unavailable");
                    Vec::new()
                }
            }
        };
        let lookups = join_all(thread.extensions.iter().map(|id| self.lookup(id, ctx)));
        let (default_tools, descriptors) = tokio::join!(defaults, lookups);

        let mut set = ExtensionSet::default();
        for tool in default_tools {
            set.tools.register(tool);
        }
        for descriptor in descriptors.into_iter().flatten() {
            for tool in &descriptor.tools {
                set.tools.register(tool.clone());
            }
            set.steps.push(ExtensionSteps {
                id: descriptor.id,
                steps: descriptor.execution_steps,
            });
        }

        debug!(
            thread_id = %thread.id,
            crm,
            tools = ?set.tools.names(),
            extensions = set.steps.len(),
            "Collected extension tools"
        );
        set
    }

    async fn lookup(&self, id: &str, ctx: &ToolContext) -> Option<ExtensionDescriptor> {
        match self.registry.lookup(id, ctx).await {
            Ok(Some(descriptor)) => Some(descriptor),
            Ok(None) => {
                debug!(extension = id, "Extension not registered");
                None
            }
            Err(e) => {
                warn!(extension = id, error = %e, "Extension lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use switchyard_core::cancel::CancellationToken;
    use switchyard_core::error::{ExtensionError, ToolError};
    use switchyard_core::reasoning::{GenerationOptions, ReasoningMode};
    use switchyard_core::thread::ThreadId;
    use switchyard_core::tool::{Tool, ToolResult};
    use switchyard_memory::StaticExtensionRegistry;

    struct Named(&'static str);

    #[async_trait]
    impl Tool for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn description(&self) -> &str {
            "test tool"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object" })
        }
        async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult { call_id: String::new(), success: true, output: self.0.into(), data: None })
        }
    }

    #[derive(Default)]
    struct Defaults {
        fail: bool,
        calls: AtomicUsize,
        seen: std::sync::Mutex<Option<GenerationOptions>>,
    }

    #[async_trait]
    impl DefaultToolSource for Defaults {
        async fn default_tools(&self, ctx: &ToolContext) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.seen.lock().unwrap() = Some(ctx.generation.clone());
            if self.fail {
                return Err(ToolError::ExecutionFailed { tool_name: "defaults".into(), reason: "down".into() });
            }
            Ok(vec![Arc::new(Named("create_image")), Arc::new(Named("edit_image_text"))])
        }
    }

    struct BrokenRegistry;

    #[async_trait]
    impl ExtensionRegistry for BrokenRegistry {
        async fn lookup(&self, id: &str, _ctx: &ToolContext) -> Result<Option<ExtensionDescriptor>, ExtensionError> {
            Err(ExtensionError::Lookup { id: id.into(), reason: "registry offline".into() })
        }
    }

    fn registry() -> Arc<StaticExtensionRegistry> {
        let mut r = StaticExtensionRegistry::default();
        r.register("weather", "1. Ask for the city.\n2. Call weather_lookup.", vec![Arc::new(Named("weather_lookup"))]);
        r.register("crm", "Answer CRM questions.", vec![Arc::new(Named("crm_lookup"))]);
        Arc::new(r)
    }

    fn thread(extensions: &[&str]) -> ConversationThread {
        let mut t = ConversationThread::new(ThreadId::from("t1"));
        t.extensions = extensions.iter().map(|s| s.to_string()).collect();
        t
    }

    fn ctx(mode: ReasoningMode) -> ToolContext {
        ToolContext {
            thread_id: ThreadId::from("t1"),
            generation: mode.options(),
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn plain_thread_gets_defaults_and_extension_tools() {
        let defaults = Arc::new(Defaults::default());
        let agg = ExtensionAggregator::new(defaults.clone(), registry(), "crm");
        let set = agg.collect(&thread(&["weather"]), &ctx(ReasoningMode::Thinking)).await;

        assert_eq!(set.tools.names(), vec!["create_image", "edit_image_text", "weather_lookup"]);
        assert_eq!(set.steps[0].id, "weather");
        assert_eq!(
            defaults.seen.lock().unwrap().clone(),
            Some(ReasoningMode::Thinking.options())
        );
    }

    #[tokio::test]
    async fn crm_thread_skips_default_tools() {
        let defaults = Arc::new(Defaults::default());
        let agg = ExtensionAggregator::new(defaults.clone(), registry(), "crm");
        let set = agg.collect(&thread(&["crm", "weather"]), &ctx(ReasoningMode::Normal)).await;

        assert_eq!(defaults.calls.load(Ordering::SeqCst), 0);
        assert_eq!(set.tools.names(), vec!["crm_lookup", "weather_lookup"]);
    }

    #[tokio::test]
    async fn failing_default_source_keeps_dynamic_tools() {
        let defaults = Arc::new(Defaults { fail: true, ..Default::default() });
        let agg = ExtensionAggregator::new(defaults, registry(), "crm");
        let set = agg.collect(&thread(&["weather"]), &ctx(ReasoningMode::Fast)).await;
        assert_eq!(set.tools.names(), vec!["weather_lookup"]);
    }

    #[tokio::test]
    async fn failing_registry_keeps_default_tools() {
        let agg = ExtensionAggregator::new(Arc::new(Defaults::default()), Arc::new(BrokenRegistry), "crm");
        let set = agg.collect(&thread(&["weather"]), &ctx(ReasoningMode::Normal)).await;
        assert_eq!(set.tools.len(), 2);
        assert!(set.steps.is_empty());
    }

    #[tokio::test]
    async fn unknown_extensions_are_skipped() {
        let agg = ExtensionAggregator::new(Arc::new(Defaults::default()), registry(), "crm");
        let set = agg.collect(&thread(&["nope"]), &ctx(ReasoningMode::Normal)).await;
        assert_eq!(set.tools.len(), 2);
        assert!(set.steps_section().is_none());
    }

    #[tokio::test]
    async fn steps_section_lists_each_extension() {
        let agg = ExtensionAggregator::new(Arc::new(Defaults::default()), registry(), "crm");
        let set = agg.collect(&thread(&["weather", "crm"]), &ctx(ReasoningMode::Normal)).await;
        let section = set.steps_section().unwrap();
        assert!(section.starts_with("## Extension steps"));
        assert!(section.contains("### weather\n1. Ask for the city."));
        assert!(section.contains("### crm\nAnswer CRM questions."));
    }
}
