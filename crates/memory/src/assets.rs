//! In-memory image asset storage.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use switchyard_core::error::ImageError;
use switchyard_core::image::{ImageAssets, ImageRef};
use switchyard_core::thread::ThreadId;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct AssetState {
    blobs: HashMap<String, Vec<u8>>,
    /// Thread → id of its current base image
    bases: HashMap<ThreadId, String>,
}

/// Keeps every saved image in memory and hands out `{base_url}/{id}.png`
/// references.
pub struct InMemoryImageAssets {
    base_url: String,
    state: Arc<RwLock<AssetState>>,
}

impl InMemoryImageAssets {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Arc::new(RwLock::new(AssetState::default())),
        }
    }

    /// Bytes of any saved image.
    pub async fn bytes(&self, id: &str) -> Option<Vec<u8>> {
        self.state.read().await.blobs.get(id).cloned()
    }

    async fn put(&self, bytes: Vec<u8>) -> ImageRef {
        let id = Uuid::new_v4().to_string();
        self.state.write().await.blobs.insert(id.clone(), bytes);
        ImageRef {
            url: format!("{}/{id}.png", self.base_url),
            id,
        }
    }
}

impl Default for InMemoryImageAssets {
    fn default() -> Self {
        Self::new("memory://images")
    }
}

#[async_trait]
impl ImageAssets for InMemoryImageAssets {
    async fn save_base(&self, thread_id: &ThreadId, bytes: Vec<u8>) -> Result<ImageRef, ImageError> {
        let image = self.put(bytes).await;
        self.state
            .write()
            .await
            .bases
            .insert(thread_id.clone(), image.id.clone());
        Ok(image)
    }

    async fn save_overlay(&self, _thread_id: &ThreadId, bytes: Vec<u8>) -> Result<ImageRef, ImageError> {
        Ok(self.put(bytes).await)
    }

    async fn base_image(&self, thread_id: &ThreadId) -> Result<Option<Vec<u8>>, ImageError> {
        let state = self.state.read().await;
        Ok(state
            .bases
            .get(thread_id)
            .and_then(|id| state.blobs.get(id))
            .cloned())
    }
}
