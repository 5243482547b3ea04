//! Storage traits: conversation threads and per-thread overlay layouts.

use async_trait::async_trait;
use crate::error::StoreError;
use crate::message::{Message, StoredTurn};
use crate::overlay::OverlayLayout;
use crate::thread::{ConversationThread, DocumentChunk, ThreadId, UserIdentity};

/// Persistent storage of threads, their turns and their indexed documents.
///
/// Treated as a request/response service; the router never caches anything
/// it reads from here across turns.
#[async_trait]
pub trait ThreadStore: Send + Sync {
    /// Load the thread, creating it when `thread_id` is `None`.
    ///
    /// Fails with [`StoreError::Unauthorized`] when `user` may not use it.
    async fn ensure_thread(
        &self,
        thread_id: Option<&ThreadId>,
        user: &UserIdentity,
    ) -> Result<ConversationThread, StoreError>;

    /// Append a turn to the thread transcript.
    async fn record_turn(&self, thread_id: &ThreadId, message: &Message) -> Result<(), StoreError>;

    /// The most recent `limit` turns, **newest first** (storage order).
    async fn recent_turns(
        &self,
        thread_id: &ThreadId,
        limit: usize,
    ) -> Result<Vec<StoredTurn>, StoreError>;

    /// Indexed document chunks for the thread, in document order.
    async fn documents(&self, thread_id: &ThreadId) -> Result<Vec<DocumentChunk>, StoreError>;
}

/// Process-local memory of the last resolved overlay per thread.
///
/// Entries are overwritten on every successful overlay resolution and
/// cleared whenever a brand-new base image is generated for the thread.
/// Turns of one thread are sequential, so last-writer-wins is enough.
#[async_trait]
pub trait LayoutStore: Send + Sync {
    async fn get(&self, thread_id: &ThreadId) -> Option<OverlayLayout>;

    async fn set(&self, thread_id: &ThreadId, layout: OverlayLayout);

    async fn clear(&self, thread_id: &ThreadId);
}
