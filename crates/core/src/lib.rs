//! # Switchyard Core
//!
//! Domain types, traits, and error definitions for the Switchyard chat
//! router. This crate has **zero framework dependencies**; it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (completion backend, thread storage, image
//! services, CRM gateway, extension registry) is a trait here.
//! Implementations live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod cancel;
pub mod crm;
pub mod error;
pub mod event;
pub mod extension;
pub mod image;
pub mod message;
pub mod overlay;
pub mod provider;
pub mod reasoning;
pub mod store;
pub mod thread;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use cancel::{CancellationToken, Cancelled, run_cancellable};
pub use crm::{CrmGateway, GatewayQuery};
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use extension::{DefaultToolSource, ExtensionDescriptor, ExtensionRegistry};
pub use image::{ImageAssets, ImageComposer, ImageGenerator, ImageRef};
pub use message::{Attachment, Message, MessageToolCall, Role, StoredTurn};
pub use overlay::{FontFamily, HorizontalAlign, OverlayLayout, SizeAdjust, SizeBucket, VerticalAlign};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolDefinition};
pub use reasoning::{GenerationOptions, ReasoningMode};
pub use store::{LayoutStore, ThreadStore};
pub use thread::{ConversationThread, DocumentChunk, ThreadId, UserIdentity};
pub use tool::{Tool, ToolCall, ToolContext, ToolRegistry, ToolResult};
