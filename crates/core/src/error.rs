//! Error types for the Switchyard domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Switchyard operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Storage errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Upstream services ---
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    #[error("Extension error: {0}")]
    Extension(#[from] ExtensionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool execution failed: {tool_name}: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("Tool timed out: {tool_name} after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool cancelled: {0}")]
    Cancelled(String),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Failures talking to the CRM natural-language query gateway.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("CRM gateway not configured")]
    NotConfigured,

    #[error("CRM gateway unreachable: {0}")]
    Transport(String),

    #[error("CRM gateway returned HTTP {status}")]
    Status { status: u16, body: String },

    #[error("CRM gateway returned malformed JSON: {0}")]
    Parse(String),

    #[error("CRM gateway timed out after {0}s")]
    Timeout(u64),

    #[error("CRM gateway request cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Error)]
pub enum ImageError {
    #[error("Image generation failed: {0}")]
    Generation(String),

    #[error("Image composition failed: {0}")]
    Composition(String),

    #[error("Image service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Image service timed out after {0}s")]
    Timeout(u64),

    #[error("No base image for thread {0}")]
    NoBaseImage(String),

    #[error("Image request cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Error)]
pub enum ExtensionError {
    #[error("Extension lookup failed for {id}: {reason}")]
    Lookup { id: String, reason: String },
}
