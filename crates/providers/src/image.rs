//! HTTP image services: OpenAI-compatible generation and an overlay
//! composition endpoint.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use switchyard_core::error::ImageError;
use switchyard_core::image::{ImageComposer, ImageGenerator};
use switchyard_core::overlay::OverlayLayout;
use switchyard_core::reasoning::GenerationOptions;
use tracing::{debug, warn};

fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .expect("Failed to create HTTP client")
}

async fn error_status(response: reqwest::Response) -> ImageError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    warn!(status, "Image service returned an error status");
    ImageError::Status { status, body }
}

fn decode(b64: &str) -> Result<Vec<u8>, String> {
    BASE64.decode(b64.trim()).map_err(|e| format!("invalid base64 image: {e}"))
}

/// `POST {api_url}/images/generations` returning `b64_json`.
pub struct OpenAiImageGenerator {
    api_url: String,
    api_key: String,
    model: String,
    size: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiImageGenerator {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        size: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            size: size.into(),
            timeout_secs,
            client: http_client(timeout_secs),
        }
    }

    pub fn from_config(config: &switchyard_config::ImagesConfig, api_key: impl Into<String>) -> Self {
        Self::new(
            &config.api_url,
            api_key,
            &config.model,
            &config.size,
            config.timeout_secs,
        )
    }
}

#[derive(Deserialize)]
struct GenerationResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    #[serde(default)]
    b64_json: Option<String>,
}

#[async_trait]
impl ImageGenerator for OpenAiImageGenerator {
    async fn generate(&self, prompt: &str, options: &GenerationOptions) -> Result<Vec<u8>, ImageError> {
        debug!(model = %self.model, quality = %options.image_quality, "Generating image");

        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "size": self.size,
            "quality": options.image_quality,
            "n": 1,
        });
        let response = self
            .client
            .post(format!("{}/images/generations", self.api_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ImageError::Timeout(self.timeout_secs)
                } else {
                    ImageError::Generation(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(error_status(response).await);
        }

        let parsed: GenerationResponse = response
            .json()
            .await
            .map_err(|e| ImageError::Generation(format!("Failed to parse response: {e}")))?;
        let b64 = parsed
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or_else(|| ImageError::Generation("response contained no image".into()))?;
        decode(&b64).map_err(ImageError::Generation)
    }
}

/// `POST {composer_url}` with the base image and a fully resolved layout.
pub struct HttpImageComposer {
    url: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ComposeRequest<'a> {
    image_b64: String,
    layout: &'a OverlayLayout,
}

#[derive(Deserialize)]
struct ComposeResponse {
    image_b64: String,
}

impl HttpImageComposer {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            url: url.into(),
            timeout_secs,
            client: http_client(timeout_secs),
        }
    }
}

#[async_trait]
impl ImageComposer for HttpImageComposer {
    async fn compose(&self, base: &[u8], layout: &OverlayLayout) -> Result<Vec<u8>, ImageError> {
        debug!(size = layout.size.as_str(), font = layout.font.as_str(), "Composing overlay");

        let request = ComposeRequest {
            image_b64: BASE64.encode(base),
            layout,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ImageError::Timeout(self.timeout_secs)
                } else {
                    ImageError::Composition(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(error_status(response).await);
        }

        let parsed: ComposeResponse = response
            .json()
            .await
            .map_err(|e| ImageError::Composition(format!("Failed to parse response: {e}")))?;
        decode(&parsed.image_b64).map_err(ImageError::Composition)
    }
}
