//! CRM direct-answer path.

pub mod bridge;
pub mod classifier;
pub mod directive;

pub use bridge::{CrmDirectBridge, CrmDirective, CrmPath};
pub use classifier::Intent;
pub use directive::Language;
