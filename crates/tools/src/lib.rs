//! Built-in tools for Switchyard.
//!
//! The default tool set offered on non-CRM threads: image creation and
//! text-overlay editing. Each tool is bound to one turn's [`ToolContext`]
//! (thread, generation preset, cancellation) by [`ImageToolkit`].

pub mod create_image;
pub mod edit_image_text;

use async_trait::async_trait;
use std::sync::Arc;
use switchyard_core::error::{ImageError, ToolError};
use switchyard_core::event::EventBus;
use switchyard_core::extension::DefaultToolSource;
use switchyard_core::image::{ImageAssets, ImageComposer, ImageGenerator};
use switchyard_core::store::LayoutStore;
use switchyard_core::tool::{Tool, ToolContext, ToolResult};
use switchyard_overlay::OverlayResolver;

pub use create_image::CreateImageTool;
pub use edit_image_text::EditImageTextTool;

/// A failed tool result explaining an upstream image-service error, so the
/// model can narrate it instead of the turn aborting.
pub(crate) fn failed(error: ImageError) -> ToolResult {
    ToolResult {
        call_id: String::new(),
        success: false,
        output: error.to_string(),
        data: None,
    }
}

/// Shared image services, handing out per-turn tool instances.
#[derive(Clone)]
pub struct ImageToolkit {
    generator: Arc<dyn ImageGenerator>,
    composer: Option<Arc<dyn ImageComposer>>,
    assets: Arc<dyn ImageAssets>,
    layouts: Arc<dyn LayoutStore>,
    events: Arc<EventBus>,
    generation_timeout_secs: u64,
}

impl ImageToolkit {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        assets: Arc<dyn ImageAssets>,
        layouts: Arc<dyn LayoutStore>,
        events: Arc<EventBus>,
        generation_timeout_secs: u64,
    ) -> Self {
        Self {
            generator,
            composer: None,
            assets,
            layouts,
            events,
            generation_timeout_secs,
        }
    }

    /// Enable `edit_image_text`; without a composer it is not offered.
    pub fn with_composer(mut self, composer: Arc<dyn ImageComposer>) -> Self {
        self.composer = Some(composer);
        self
    }

    pub fn create_image_tool(&self, ctx: ToolContext) -> CreateImageTool {
        CreateImageTool {
            generator: self.generator.clone(),
            assets: self.assets.clone(),
            layouts: self.layouts.clone(),
            events: self.events.clone(),
            timeout_secs: self.generation_timeout_secs,
            ctx,
        }
    }

    pub fn edit_image_text_tool(&self, ctx: ToolContext) -> Option<EditImageTextTool> {
        self.composer.as_ref().map(|composer| EditImageTextTool {
            composer: composer.clone(),
            assets: self.assets.clone(),
            resolver: OverlayResolver::new(self.layouts.clone()),
            ctx,
        })
    }
}

#[async_trait]
impl DefaultToolSource for ImageToolkit {
    async fn default_tools(&self, ctx: &ToolContext) -> Result<Vec<Arc<dyn Tool>>, ToolError> {
        let mut tools: Vec<Arc<dyn Tool>> = vec![Arc::new(self.create_image_tool(ctx.clone()))];
        if let Some(edit) = self.edit_image_text_tool(ctx.clone()) {
            tools.push(Arc::new(edit));
        }
        Ok(tools)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use switchyard_core::cancel::CancellationToken;
    use switchyard_core::overlay::OverlayLayout;
    use switchyard_core::reasoning::GenerationOptions;
    use switchyard_core::thread::ThreadId;
    use switchyard_memory::{InMemoryImageAssets, InMemoryLayoutStore};

    pub enum Behaviour {
        Bytes(Vec<u8>),
        Fail,
        Slow(Duration),
    }

    pub struct FakeGenerator {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl FakeGenerator {
        pub fn bytes(bytes: Vec<u8>) -> Self {
            Self { behaviour: Behaviour::Bytes(bytes), calls: AtomicUsize::new(0) }
        }
        pub fn failing() -> Self {
            Self { behaviour: Behaviour::Fail, calls: AtomicUsize::new(0) }
        }
        pub fn slow(delay: Duration) -> Self {
            Self { behaviour: Behaviour::Slow(delay), calls: AtomicUsize::new(0) }
        }
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ImageGenerator for FakeGenerator {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<Vec<u8>, ImageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Bytes(b) => Ok(b.clone()),
                Behaviour::Fail => Err(ImageError::Status { status: 500, body: "boom".into() }),
                Behaviour::Slow(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(vec![0])
                }
            }
        }
    }

    /// Appends the text length to the base so results are distinguishable.
    #[derive(Default)]
    pub struct FakeComposer {
        bases: Mutex<Vec<Vec<u8>>>,
        fail_next: AtomicBool,
    }

    impl FakeComposer {
        pub fn calls(&self) -> usize {
            self.bases.lock().unwrap().len()
        }
        pub fn bases(&self) -> Vec<Vec<u8>> {
            self.bases.lock().unwrap().clone()
        }
        pub fn fail_next(&self) {
            self.fail_next.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl ImageComposer for FakeComposer {
        async fn compose(&self, base: &[u8], layout: &OverlayLayout) -> Result<Vec<u8>, ImageError> {
            self.bases.lock().unwrap().push(base.to_vec());
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(ImageError::Composition("renderer crashed".into()));
            }
            let mut out = base.to_vec();
            out.push(layout.text.chars().count() as u8);
            Ok(out)
        }
    }

    pub struct Parts {
        pub generator: Arc<FakeGenerator>,
        pub composer: Arc<FakeComposer>,
        pub assets: Arc<InMemoryImageAssets>,
        pub layouts: Arc<InMemoryLayoutStore>,
        pub events: Arc<EventBus>,
    }

    pub fn toolkit(generator: FakeGenerator) -> (ImageToolkit, Parts) {
        let parts = Parts {
            generator: Arc::new(generator),
            composer: Arc::new(FakeComposer::default()),
            assets: Arc::new(InMemoryImageAssets::default()),
            layouts: Arc::new(InMemoryLayoutStore::new()),
            events: Arc::new(EventBus::default()),
        };
        let kit = ImageToolkit::new(
            parts.generator.clone(),
            parts.assets.clone(),
            parts.layouts.clone(),
            parts.events.clone(),
            30,
        )
        .with_composer(parts.composer.clone());
        (kit, parts)
    }

    pub fn context(thread: &str) -> ToolContext {
        ToolContext {
            thread_id: ThreadId::from(thread),
            generation: GenerationOptions::default(),
            cancel: CancellationToken::new(),
        }
    }
}
