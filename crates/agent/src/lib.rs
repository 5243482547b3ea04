//! The response strategy router, the heart of Switchyard.
//!
//! Every user turn goes through the same pipeline:
//!
//! 1. **Establish** the thread for the caller
//! 2. **Gather** sanitized history, indexed documents and the thread's tools
//! 3. **Record** the user turn before anything is generated
//! 4. **Classify** the turn: image attachment, documents, or extensions
//! 5. **Generate** in a spawned task, streaming [`AgentStreamEvent`]s
//!
//! CRM threads take a dedicated path through [`crm::CrmDirectBridge`]:
//! the gateway is queried directly and its result is injected as a system
//! directive instead of being offered as a tool.

pub mod crm;
pub mod documents;
pub mod extensions;
mod generation;
pub mod history;
pub mod model;
pub mod router;
pub mod strategy;
pub mod stream_event;

#[cfg(test)]
mod test_helpers;

pub use crm::{CrmDirectBridge, CrmDirective, CrmPath};
pub use extensions::{ExtensionAggregator, ExtensionSet};
pub use history::HistoryProfile;
pub use model::ModelSelector;
pub use router::{
    CompletedTurn, ResponseStrategyRouter, RouterSettings, TurnError, TurnHandle, TurnRequest,
};
pub use strategy::Strategy;
pub use stream_event::AgentStreamEvent;
