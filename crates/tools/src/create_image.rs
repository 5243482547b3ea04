//! `create_image` — generate a fresh base image from a prompt.
//!
//! A new base image invalidates the thread's remembered overlay, so the
//! layout memory is cleared and a `LayoutReset` event is published.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use switchyard_core::cancel::run_cancellable;
use switchyard_core::error::{ImageError, ToolError};
use switchyard_core::event::{DomainEvent, EventBus};
use switchyard_core::image::{ImageAssets, ImageGenerator};
use switchyard_core::store::LayoutStore;
use switchyard_core::tool::{Tool, ToolContext, ToolResult};
use tracing::{info, warn};

use crate::failed;

pub struct CreateImageTool {
    pub(crate) generator: Arc<dyn ImageGenerator>,
    pub(crate) assets: Arc<dyn ImageAssets>,
    pub(crate) layouts: Arc<dyn LayoutStore>,
    pub(crate) events: Arc<EventBus>,
    pub(crate) timeout_secs: u64,
    pub(crate) ctx: ToolContext,
}

#[derive(Deserialize)]
struct CreateImageArgs {
    #[serde(default)]
    prompt: Option<String>,
}

#[async_trait]
impl Tool for CreateImageTool {
    fn name(&self) -> &str {
        "create_image"
    }

    fn description(&self) -> &str {
        "Generate a new image from a text prompt. The result becomes the base image \
         for later text overlays in this conversation."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Detailed description of the image to generate"
                }
            },
            "required": ["prompt"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: CreateImageArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let prompt = args
            .prompt
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'prompt' argument".into()))?;

        let thread_id = &self.ctx.thread_id;
        let generation = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            self.generator.generate(prompt, &self.ctx.generation),
        );
        let bytes = match run_cancellable(&self.ctx.cancel, generation).await {
            Err(_) => return Err(ToolError::Cancelled(self.name().into())),
            Ok(Err(_elapsed)) => {
                warn!(thread_id = %thread_id, timeout_secs = self.timeout_secs, "Image generation timed out");
                return Ok(failed(ImageError::Timeout(self.timeout_secs)));
            }
            Ok(Ok(Err(e))) => {
                warn!(thread_id = %thread_id, error = %e, "Image generation failed");
                return Ok(failed(e));
            }
            Ok(Ok(Ok(bytes))) => bytes,
        };

        let image = match self.assets.save_base(thread_id, bytes).await {
            Ok(image) => image,
            Err(e) => return Ok(failed(e)),
        };

        self.layouts.clear(thread_id).await;
        self.events.publish(DomainEvent::LayoutReset {
            thread_id: thread_id.to_string(),
            timestamp: Utc::now(),
        });
        info!(thread_id = %thread_id, image_id = %image.id, "Created base image");

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: format!("Image created: {}", image.url),
            data: Some(serde_json::json!({ "image": image })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeGenerator, context, toolkit};
    use switchyard_core::overlay::OverlayLayout;

    #[tokio::test]
    async fn missing_prompt_is_rejected_before_generation() {
        let (kit, parts) = toolkit(FakeGenerator::bytes(vec![1]));
        let tool = kit.create_image_tool(context("t1"));
        let err = tool.execute(serde_json::json!({ "prompt": "  " })).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert_eq!(parts.generator.calls(), 0);
    }

    #[tokio::test]
    async fn new_base_image_clears_layout_and_publishes_reset() {
        let (kit, parts) = toolkit(FakeGenerator::bytes(vec![1, 2, 3]));
        let ctx = context("t1");
        parts.layouts.set(&ctx.thread_id, OverlayLayout::with_text("OLD")).await;
        let mut events = parts.events.subscribe();

        let result = kit
            .create_image_tool(ctx.clone())
            .execute(serde_json::json!({ "prompt": "a lighthouse at dusk" }))
            .await
            .unwrap();

        assert!(result.success);
        assert!(parts.layouts.get(&ctx.thread_id).await.is_none());
        assert_eq!(parts.assets.base_image(&ctx.thread_id).await.unwrap(), Some(vec![1, 2, 3]));
        let event = events.recv().await.unwrap();
        assert!(matches!(&*event, DomainEvent::LayoutReset { thread_id, .. } if thread_id == "t1"));
    }

    #[tokio::test]
    async fn generation_failure_is_a_failed_result() {
        let (kit, parts) = toolkit(FakeGenerator::failing());
        let ctx = context("t1");
        parts.layouts.set(&ctx.thread_id, OverlayLayout::with_text("KEEP")).await;

        let result = kit
            .create_image_tool(ctx.clone())
            .execute(serde_json::json!({ "prompt": "x" }))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(parts.layouts.get(&ctx.thread_id).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_generation_times_out() {
        let (kit, _parts) = toolkit(FakeGenerator::slow(Duration::from_secs(600)));
        let result = kit
            .create_image_tool(context("t1"))
            .execute(serde_json::json!({ "prompt": "x" }))
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.output.contains("timed out"));
    }

    #[tokio::test]
    async fn cancelled_turn_cancels_generation() {
        let (kit, _parts) = toolkit(FakeGenerator::slow(Duration::from_secs(600)));
        let ctx = context("t1");
        ctx.cancel.cancel();
        let err = kit
            .create_image_tool(ctx)
            .execute(serde_json::json!({ "prompt": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Cancelled(_)));
    }
}
