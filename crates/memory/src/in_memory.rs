//! In-memory stores: the process-local layout memory, plus a thread store
//! for tests and ephemeral CLI sessions.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use switchyard_core::error::StoreError;
use switchyard_core::message::{Message, StoredTurn};
use switchyard_core::overlay::OverlayLayout;
use switchyard_core::store::{LayoutStore, ThreadStore};
use switchyard_core::thread::{ConversationThread, DocumentChunk, ThreadId, UserIdentity};
use tokio::sync::RwLock;
use tracing::debug;

/// Last resolved overlay per thread. Nothing survives a restart.
#[derive(Default)]
pub struct InMemoryLayoutStore {
    layouts: Arc<RwLock<HashMap<ThreadId, OverlayLayout>>>,
}

impl InMemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LayoutStore for InMemoryLayoutStore {
    async fn get(&self, thread_id: &ThreadId) -> Option<OverlayLayout> {
        self.layouts.read().await.get(thread_id).cloned()
    }

    async fn set(&self, thread_id: &ThreadId, layout: OverlayLayout) {
        self.layouts.write().await.insert(thread_id.clone(), layout);
    }

    async fn clear(&self, thread_id: &ThreadId) {
        if self.layouts.write().await.remove(thread_id).is_some() {
            debug!(thread_id = %thread_id, "Cleared remembered overlay layout");
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ThreadRecord {
    pub(crate) thread: ConversationThread,
    /// Oldest first
    #[serde(default)]
    pub(crate) turns: Vec<StoredTurn>,
    #[serde(default)]
    pub(crate) documents: Vec<DocumentChunk>,
}

impl ThreadRecord {
    pub(crate) fn new(thread: ConversationThread) -> Self {
        Self {
            thread,
            turns: Vec::new(),
            documents: Vec::new(),
        }
    }
}

/// Check that `user` may use `thread`. Unowned threads are open to everyone.
pub(crate) fn authorize(thread: &ConversationThread, user: &UserIdentity) -> Result<(), StoreError> {
    match &thread.owner {
        Some(owner) if owner.id != user.id => Err(StoreError::Unauthorized(format!(
            "user '{}' may not access thread {}",
            user.id, thread.id
        ))),
        _ => Ok(()),
    }
}

/// The `limit` newest turns, newest first.
pub(crate) fn newest_first(turns: &[StoredTurn], limit: usize) -> Vec<StoredTurn> {
    turns.iter().rev().take(limit).cloned().collect()
}

/// A thread store held entirely in memory.
///
/// Unknown thread ids are created on first use and owned by the caller.
#[derive(Default)]
pub struct InMemoryThreadStore {
    threads: Arc<RwLock<HashMap<ThreadId, ThreadRecord>>>,
    denied_users: Arc<RwLock<HashSet<String>>>,
}

impl InMemoryThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-configured thread, replacing any existing one.
    pub async fn insert_thread(&self, thread: ConversationThread) {
        self.threads
            .write()
            .await
            .insert(thread.id.clone(), ThreadRecord::new(thread));
    }

    /// Append stored turns verbatim, oldest first.
    pub async fn seed_turns(&self, thread_id: &ThreadId, turns: Vec<StoredTurn>) {
        let mut threads = self.threads.write().await;
        let record = threads
            .entry(thread_id.clone())
            .or_insert_with(|| ThreadRecord::new(ConversationThread::new(thread_id.clone())));
        record.turns.extend(turns);
    }

    pub async fn add_document(&self, thread_id: &ThreadId, chunk: DocumentChunk) {
        let mut threads = self.threads.write().await;
        let record = threads
            .entry(thread_id.clone())
            .or_insert_with(|| ThreadRecord::new(ConversationThread::new(thread_id.clone())));
        record.documents.push(chunk);
    }

    /// Refuse every thread to this user id.
    pub async fn deny_user(&self, user_id: impl Into<String>) {
        self.denied_users.write().await.insert(user_id.into());
    }

    /// Full transcript, oldest first.
    pub async fn transcript(&self, thread_id: &ThreadId) -> Vec<StoredTurn> {
        self.threads
            .read()
            .await
            .get(thread_id)
            .map(|r| r.turns.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ThreadStore for InMemoryThreadStore {
    async fn ensure_thread(
        &self,
        thread_id: Option<&ThreadId>,
        user: &UserIdentity,
    ) -> Result<ConversationThread, StoreError> {
        if self.denied_users.read().await.contains(&user.id) {
            return Err(StoreError::Unauthorized(format!("user '{}' is not allowed", user.id)));
        }

        let mut threads = self.threads.write().await;
        let id = thread_id.cloned().unwrap_or_default();
        if let Some(record) = threads.get(&id) {
            authorize(&record.thread, user)?;
            return Ok(record.thread.clone());
        }

        let mut thread = ConversationThread::new(id.clone());
        thread.owner = Some(user.clone());
        debug!(thread_id = %id, user = %user.id, "Created thread");
        threads.insert(id, ThreadRecord::new(thread.clone()));
        Ok(thread)
    }

    async fn record_turn(&self, thread_id: &ThreadId, message: &Message) -> Result<(), StoreError> {
        let mut threads = self.threads.write().await;
        let record = threads
            .get_mut(thread_id)
            .ok_or_else(|| StoreError::NotFound(format!("thread {thread_id}")))?;
        record.turns.push(StoredTurn::from(message.clone()));
        Ok(())
    }

    async fn recent_turns(
        &self,
        thread_id: &ThreadId,
        limit: usize,
    ) -> Result<Vec<StoredTurn>, StoreError> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .map(|r| newest_first(&r.turns, limit))
            .unwrap_or_default())
    }

    async fn documents(&self, thread_id: &ThreadId) -> Result<Vec<DocumentChunk>, StoreError> {
        let threads = self.threads.read().await;
        Ok(threads
            .get(thread_id)
            .map(|r| r.documents.clone())
            .unwrap_or_default())
    }
}
