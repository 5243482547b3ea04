//! Image services: generation, composition and per-thread asset storage.
//!
//! The raster work itself happens elsewhere; these traits only describe the
//! parameters that cross the boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ImageError;
use crate::overlay::OverlayLayout;
use crate::reasoning::GenerationOptions;
use crate::thread::ThreadId;

/// A stored image, addressable by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
    pub url: String,
}

/// Text prompt → image bytes.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Vec<u8>, ImageError>;
}

/// Base image bytes + resolved overlay → new image bytes.
#[async_trait]
pub trait ImageComposer: Send + Sync {
    async fn compose(&self, base: &[u8], layout: &OverlayLayout) -> Result<Vec<u8>, ImageError>;
}

/// Blob storage for generated images, tracking each thread's current base.
#[async_trait]
pub trait ImageAssets: Send + Sync {
    /// Store a freshly generated image and make it the thread's base image.
    async fn save_base(&self, thread_id: &ThreadId, bytes: Vec<u8>) -> Result<ImageRef, ImageError>;

    /// Store a composed image; the base image is left untouched.
    async fn save_overlay(&self, thread_id: &ThreadId, bytes: Vec<u8>) -> Result<ImageRef, ImageError>;

    /// Bytes of the thread's current base image, if any.
    async fn base_image(&self, thread_id: &ThreadId) -> Result<Option<Vec<u8>>, ImageError>;
}
