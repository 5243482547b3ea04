//! A fixed, process-local extension registry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use switchyard_core::error::ExtensionError;
use switchyard_core::extension::{ExtensionDescriptor, ExtensionRegistry};
use switchyard_core::tool::{Tool, ToolContext};

/// Extensions registered up front. Lookups ignore the tool context; the
/// tools are shared across threads.
#[derive(Default, Clone)]
pub struct StaticExtensionRegistry {
    extensions: HashMap<String, ExtensionDescriptor>,
}

impl StaticExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        id: impl Into<String>,
        execution_steps: impl Into<String>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> &mut Self {
        let id = id.into();
        self.extensions.insert(
            id.clone(),
            ExtensionDescriptor {
                id,
                execution_steps: execution_steps.into(),
                tools,
            },
        );
        self
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.extensions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[async_trait]
impl ExtensionRegistry for StaticExtensionRegistry {
    async fn lookup(&self, id: &str, _ctx: &ToolContext) -> Result<Option<ExtensionDescriptor>, ExtensionError> {
        Ok(self.extensions.get(id).cloned())
    }
}
