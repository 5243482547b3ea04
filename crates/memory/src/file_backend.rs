//! File-based thread store — one JSON document per thread.
//!
//! Storage location: `~/.switchyard/threads/<thread-id>.json`. Every call
//! reads the file afresh and every mutation rewrites it, so two CLI runs on
//! the same `--thread` see each other's turns.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use switchyard_core::error::StoreError;
use switchyard_core::message::{Message, StoredTurn};
use switchyard_core::store::ThreadStore;
use switchyard_core::thread::{ConversationThread, DocumentChunk, ThreadId, UserIdentity};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::in_memory::{ThreadRecord, authorize, newest_first};

pub struct FileThreadStore {
    dir: PathBuf,
    /// Serialises read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileThreadStore {
    pub fn new(dir: PathBuf) -> Self {
        debug!(dir = %dir.display(), "File thread store opened");
        Self {
            dir,
            write_lock: Mutex::new(()),
        }
    }

    /// Default directory: `~/.switchyard/threads`
    pub fn default_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".switchyard").join("threads")
    }

    fn path_for(&self, thread_id: &ThreadId) -> Result<PathBuf, StoreError> {
        let id = thread_id.as_str();
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(StoreError::Storage(format!("invalid thread id '{id}'")));
        }
        Ok(self.dir.join(format!("{id}.json")))
    }

    async fn load(path: &Path) -> Result<Option<ThreadRecord>, StoreError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::Storage(format!("Failed to read thread file: {e}"))),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Storage(format!("Corrupted thread file {}: {e}", path.display())))
    }

    async fn save(&self, path: &Path, record: &ThreadRecord) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to create thread directory: {e}")))?;
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize thread: {e}")))?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write thread file: {e}")))
    }

    /// Attach a document chunk to a thread, creating the thread if needed.
    pub async fn add_document(&self, thread_id: &ThreadId, chunk: DocumentChunk) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(thread_id)?;
        let mut record = Self::load(&path)
            .await?
            .unwrap_or_else(|| ThreadRecord::new(ConversationThread::new(thread_id.clone())));
        record.documents.push(chunk);
        self.save(&path, &record).await
    }

    /// Apply `update` to a thread's settings, creating the thread for
    /// `user` when it does not exist yet.
    pub async fn update_thread(
        &self,
        thread_id: &ThreadId,
        user: &UserIdentity,
        update: impl FnOnce(&mut ConversationThread),
    ) -> Result<ConversationThread, StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(thread_id)?;
        let mut record = match Self::load(&path).await? {
            Some(record) => {
                authorize(&record.thread, user)?;
                record
            }
            None => {
                let mut thread = ConversationThread::new(thread_id.clone());
                thread.owner = Some(user.clone());
                ThreadRecord::new(thread)
            }
        };
        update(&mut record.thread);
        self.save(&path, &record).await?;
        Ok(record.thread)
    }
}

#[async_trait]
impl ThreadStore for FileThreadStore {
    async fn ensure_thread(
        &self,
        thread_id: Option<&ThreadId>,
        user: &UserIdentity,
    ) -> Result<ConversationThread, StoreError> {
        let _guard = self.write_lock.lock().await;
        let id = thread_id.cloned().unwrap_or_default();
        let path = self.path_for(&id)?;

        if let Some(record) = Self::load(&path).await? {
            authorize(&record.thread, user)?;
            return Ok(record.thread);
        }

        let mut thread = ConversationThread::new(id);
        thread.owner = Some(user.clone());
        self.save(&path, &ThreadRecord::new(thread.clone())).await?;
        Ok(thread)
    }

    async fn record_turn(&self, thread_id: &ThreadId, message: &Message) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(thread_id)?;
        let mut record = Self::load(&path)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("thread {thread_id}")))?;
        record.turns.push(StoredTurn::from(message.clone()));
        self.save(&path, &record).await
    }

    async fn recent_turns(
        &self,
        thread_id: &ThreadId,
        limit: usize,
    ) -> Result<Vec<StoredTurn>, StoreError> {
        let path = self.path_for(thread_id)?;
        match Self::load(&path).await? {
            Some(record) => Ok(newest_first(&record.turns, limit)),
            None => {
                warn!(thread_id = %thread_id, "History requested for unknown thread");
                Ok(Vec::new())
            }
        }
    }

    async fn documents(&self, thread_id: &ThreadId) -> Result<Vec<DocumentChunk>, StoreError> {
        let path = self.path_for(thread_id)?;
        Ok(Self::load(&path)
            .await?
            .map(|r| r.documents)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn alice() -> UserIdentity {
        UserIdentity { id: "alice".into(), email: None }
    }

    #[tokio::test]
    async fn turns_persist_across_instances() {
        let dir = TempDir::new().unwrap();
        let store = FileThreadStore::new(dir.path().to_path_buf());
        let thread = store.ensure_thread(None, &alice()).await.unwrap();
        store.record_turn(&thread.id, &Message::user("hello")).await.unwrap();
        store.record_turn(&thread.id, &Message::assistant("hi there")).await.unwrap();

        let reopened = FileThreadStore::new(dir.path().to_path_buf());
        let again = reopened.ensure_thread(Some(&thread.id), &alice()).await.unwrap();
        assert_eq!(again.id, thread.id);
        let turns = reopened.recent_turns(&thread.id, 10).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content.as_deref(), Some("hi there"));
    }

    #[tokio::test]
    async fn foreign_owner_is_unauthorized() {
        let dir = TempDir::new().unwrap();
        let store = FileThreadStore::new(dir.path().to_path_buf());
        let thread = store.ensure_thread(None, &alice()).await.unwrap();
        let mallory = UserIdentity { id: "mallory".into(), email: None };
        let err = store.ensure_thread(Some(&thread.id), &mallory).await.unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn path_traversal_ids_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileThreadStore::new(dir.path().to_path_buf());
        let err = store
            .ensure_thread(Some(&ThreadId::from("../escape")), &alice())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }

    #[tokio::test]
    async fn corrupted_file_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let store = FileThreadStore::new(dir.path().to_path_buf());
        let err = store.recent_turns(&ThreadId::from("broken"), 5).await.unwrap_err();
        assert!(matches!(err, StoreError::Storage(_)));
    }

    #[tokio::test]
    async fn update_thread_keeps_turns() {
        let dir = TempDir::new().unwrap();
        let store = FileThreadStore::new(dir.path().to_path_buf());
        let id = ThreadId::from("crm-1");
        store.update_thread(&id, &alice(), |_| {}).await.unwrap();
        store.record_turn(&id, &Message::user("hello")).await.unwrap();

        let updated = store
            .update_thread(&id, &alice(), |t| t.extensions = vec!["crm".into()])
            .await
            .unwrap();
        assert!(updated.has_extension("crm"));
        assert_eq!(updated.owner.as_ref().map(|o| o.id.as_str()), Some("alice"));
        assert_eq!(store.recent_turns(&id, 10).await.unwrap().len(), 1);

        let mallory = UserIdentity { id: "mallory".into(), email: None };
        let err = store.update_thread(&id, &mallory, |_| {}).await.unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn documents_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FileThreadStore::new(dir.path().to_path_buf());
        let id = ThreadId::from("docs");
        store
            .add_document(&id, DocumentChunk { source: "q3.pdf".into(), content: "Revenue grew".into() })
            .await
            .unwrap();
        let docs = store.documents(&id).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].source, "q3.pdf");
    }
}
