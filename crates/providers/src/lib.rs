//! Outbound HTTP services for Switchyard.
//!
//! - [`OpenAiCompatProvider`]: completion backend (`Provider`)
//! - [`HttpCrmGateway`]: CRM natural-language query gateway (`CrmGateway`)
//! - [`OpenAiImageGenerator`] / [`HttpImageComposer`]: image services
//!
//! The router selects the completion provider based on configuration.

pub mod crm_gateway;
pub mod image;
pub mod openai_compat;
pub mod router;

pub use crm_gateway::HttpCrmGateway;
pub use image::{HttpImageComposer, OpenAiImageGenerator};
pub use openai_compat::OpenAiCompatProvider;
pub use router::{ProviderRouter, build_from_config};
