//! Configuration loading, validation, and management for Switchyard.
//!
//! Loads configuration from `~/.switchyard/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.switchyard/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default completion provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Specialised model selection
    #[serde(default)]
    pub models: ModelsConfig,

    /// Chat routing settings
    #[serde(default)]
    pub chat: ChatConfig,

    /// CRM direct-answer integration
    #[serde(default)]
    pub crm: CrmConfig,

    /// Image generation and composition services
    #[serde(default)]
    pub images: ImagesConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openrouter".into()
}
fn default_model() -> String {
    "openai/gpt-4.1-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("models", &self.models)
            .field("chat", &self.chat)
            .field("crm", &self.crm)
            .field("images", &self.images)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model used for both CRM sub-paths (orchestration and summarisation).
    /// Falls back to `default_model` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crm_orchestrator: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// How many stored turns are replayed as history
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// How many document chunks the chat-with-file strategy injects
    #[serde(default = "default_max_document_chunks")]
    pub max_document_chunks: usize,
}

fn default_history_limit() -> usize {
    40
}
fn default_max_document_chunks() -> usize {
    6
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            max_document_chunks: default_max_document_chunks(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    /// Extension identifier that flags a thread as CRM-backed
    #[serde(default = "default_crm_extension_id")]
    pub extension_id: String,

    /// Natural-language query endpoint; the CRM path reports a failure when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_url: Option<String>,

    #[serde(default = "default_crm_engine")]
    pub engine: String,

    #[serde(default = "default_crm_mode")]
    pub mode: String,

    /// Header carrying the caller's identity for result scoping
    #[serde(default = "default_crm_user_header")]
    pub user_header: String,

    /// Serialized gateway JSON beyond this many characters is truncated
    #[serde(default = "default_crm_max_result_chars")]
    pub max_result_chars: usize,

    #[serde(default = "default_crm_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_crm_extension_id() -> String {
    "crm".into()
}
fn default_crm_engine() -> String {
    "nl2query".into()
}
fn default_crm_mode() -> String {
    "auto".into()
}
fn default_crm_user_header() -> String {
    "X-User-Email".into()
}
fn default_crm_max_result_chars() -> usize {
    12_000
}
fn default_crm_timeout_secs() -> u64 {
    30
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            extension_id: default_crm_extension_id(),
            gateway_url: None,
            engine: default_crm_engine(),
            mode: default_crm_mode(),
            user_header: default_crm_user_header(),
            max_result_chars: default_crm_max_result_chars(),
            timeout_secs: default_crm_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    /// OpenAI-compatible images endpoint base URL
    #[serde(default = "default_images_api_url")]
    pub api_url: String,

    #[serde(default = "default_images_model")]
    pub model: String,

    #[serde(default = "default_images_size")]
    pub size: String,

    /// Best-effort timeout on a single generation call
    #[serde(default = "default_images_timeout_secs")]
    pub timeout_secs: u64,

    /// Composition service endpoint; overlay editing is unavailable when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composer_url: Option<String>,
}

fn default_images_api_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_images_model() -> String {
    "gpt-image-1".into()
}
fn default_images_size() -> String {
    "1024x1024".into()
}
fn default_images_timeout_secs() -> u64 {
    60
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            api_url: default_images_api_url(),
            model: default_images_model(),
            size: default_images_size(),
            timeout_secs: default_images_timeout_secs(),
            composer_url: None,
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.switchyard/config.toml).
    ///
    /// Also checks environment variables:
    /// - `SWITCHYARD_API_KEY` (highest priority), `OPENROUTER_API_KEY`, `OPENAI_API_KEY`
    /// - `SWITCHYARD_PROVIDER`, `SWITCHYARD_MODEL`
    /// - `SWITCHYARD_CRM_MODEL`, `SWITCHYARD_CRM_GATEWAY_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("SWITCHYARD_API_KEY")
                .or_else(|| lookup("OPENROUTER_API_KEY"))
                .or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("SWITCHYARD_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("SWITCHYARD_MODEL") {
            self.default_model = model;
        }
        if let Some(model) = lookup("SWITCHYARD_CRM_MODEL") {
            self.models.crm_orchestrator = Some(model);
        }
        if let Some(url) = lookup("SWITCHYARD_CRM_GATEWAY_URL") {
            self.crm.gateway_url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".switchyard")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.crm.extension_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "crm.extension_id must not be empty".into(),
            ));
        }

        if self.crm.max_result_chars == 0 {
            return Err(ConfigError::ValidationError(
                "crm.max_result_chars must be > 0".into(),
            ));
        }

        if self.images.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "images.timeout_secs must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for the `config` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            models: ModelsConfig::default(),
            chat: ChatConfig::default(),
            crm: CrmConfig::default(),
            images: ImagesConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
