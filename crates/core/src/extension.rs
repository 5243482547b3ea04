//! Extensions: dynamically registered tool bundles enabled per thread.

use async_trait::async_trait;
use std::sync::Arc;
use crate::error::{ExtensionError, ToolError};
use crate::tool::{Tool, ToolContext};

/// A resolved extension.
#[derive(Clone)]
pub struct ExtensionDescriptor {
    pub id: String,

    /// Human-readable execution steps, injected into the system instruction
    pub execution_steps: String,

    /// Callable tools; each carries its own input schema
    pub tools: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("id", &self.id)
            .field("execution_steps", &self.execution_steps)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Lookup of extensions by identifier.
#[async_trait]
pub trait ExtensionRegistry: Send + Sync {
    /// `Ok(None)` means the extension is not registered.
    async fn lookup(&self, id: &str, ctx: &ToolContext) -> Result<Option<ExtensionDescriptor>, ExtensionError>;
}

/// Source of the built-in tools offered on non-CRM threads.
#[async_trait]
pub trait DefaultToolSource: Send + Sync {
    async fn default_tools(&self, ctx: &ToolContext) -> Result<Vec<Arc<dyn Tool>>, ToolError>;
}
