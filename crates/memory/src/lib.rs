//! Storage implementations for Switchyard: thread transcripts, the per-thread
//! overlay layout memory, image assets and a static extension registry.

pub mod assets;
pub mod extensions;
pub mod file_backend;
pub mod in_memory;

pub use assets::InMemoryImageAssets;
pub use extensions::StaticExtensionRegistry;
pub use file_backend::FileThreadStore;
pub use in_memory::{InMemoryLayoutStore, InMemoryThreadStore};
