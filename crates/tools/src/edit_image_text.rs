//! `edit_image_text` — place or restyle the text overlay on the thread's
//! base image.
//!
//! The overlay is always composited onto the *base* image, never onto the
//! previous composite. The resolved layout is remembered before composing,
//! so a failed composition still leaves the requested styling in place.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use switchyard_core::cancel::run_cancellable;
use switchyard_core::error::{ImageError, ToolError};
use switchyard_core::image::{ImageAssets, ImageComposer};
use switchyard_core::tool::{Tool, ToolContext, ToolResult};
use switchyard_overlay::{OverlayRequest, OverlayResolver, ResolveError};
use tracing::{info, warn};

use crate::failed;

pub struct EditImageTextTool {
    pub(crate) composer: Arc<dyn ImageComposer>,
    pub(crate) assets: Arc<dyn ImageAssets>,
    pub(crate) resolver: OverlayResolver,
    pub(crate) ctx: ToolContext,
}

#[derive(Debug, Default, Deserialize)]
struct EditArgs {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    instruction: Option<String>,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    font: Option<String>,
    #[serde(default)]
    style: Option<String>,
}

impl EditArgs {
    fn request(&self) -> OverlayRequest<'_> {
        OverlayRequest {
            text: self.text.as_deref(),
            instruction: self.instruction.as_deref(),
            position: self.position.as_deref(),
            size: self.size.as_deref(),
            color: self.color.as_deref(),
            font: self.font.as_deref(),
            style: self.style.as_deref(),
        }
    }
}

#[async_trait]
impl Tool for EditImageTextTool {
    fn name(&self) -> &str {
        "edit_image_text"
    }

    fn description(&self) -> &str {
        "Add or adjust text on the current image. Pass the user's styling request verbatim \
         as 'instruction' (e.g. 'a little to the right', 'bigger', 'top-left in bold'). \
         Omit 'text' to keep the current wording."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Text to show on the image" },
                "instruction": { "type": "string", "description": "The user's styling request, verbatim" },
                "position": { "type": "string", "description": "e.g. top, bottom-right, center" },
                "size": { "type": "string", "enum": ["small", "medium", "large", "xlarge"] },
                "color": { "type": "string", "description": "Color name or #RRGGBB" },
                "font": { "type": "string", "enum": ["gothic", "mincho", "meiryo"] },
                "style": { "type": "string", "description": "e.g. bold, italic" }
            },
            "required": ["instruction"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let args: EditArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        let thread_id = &self.ctx.thread_id;

        let resolution = self
            .resolver
            .resolve(thread_id, &args.request())
            .await
            .map_err(|e| match e {
                ResolveError::MissingText => ToolError::InvalidArguments(
                    "Missing 'text' argument and no previous overlay to reuse".into(),
                ),
            })?;

        let base = match self.assets.base_image(thread_id).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(failed(ImageError::NoBaseImage(thread_id.to_string()))),
            Err(e) => return Ok(failed(e)),
        };

        let composed = match run_cancellable(
            &self.ctx.cancel,
            self.composer.compose(&base, &resolution.layout),
        )
        .await
        {
            Err(_) => return Err(ToolError::Cancelled(self.name().into())),
            Ok(Err(e)) => {
                warn!(thread_id = %thread_id, error = %e, "Overlay composition failed");
                return Ok(failed(e));
            }
            Ok(Ok(bytes)) => bytes,
        };

        let image = match self.assets.save_overlay(thread_id, composed).await {
            Ok(image) => image,
            Err(e) => return Ok(failed(e)),
        };

        info!(
            thread_id = %thread_id,
            image_id = %image.id,
            size = resolution.layout.size.as_str(),
            text_preserved = resolution.text_preserved,
            "Composed text overlay"
        );

        let mut output = format!("Overlay applied: {}", image.url);
        if resolution.text_preserved {
            output.push_str(&format!(" (kept existing text \"{}\")", resolution.layout.text));
        }

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output,
            data: Some(serde_json::json!({
                "image": image,
                "layout": resolution.layout,
                "size_before": resolution.size_note.before,
                "size_after": resolution.size_note.after,
            })),
        })
    }
}
