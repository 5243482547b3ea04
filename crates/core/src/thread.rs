//! Conversation threads and the documents indexed against them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The authenticated caller, used to scope CRM gateway results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A conversation thread as loaded once per request.
///
/// `persona` and `extensions` are read-only for the duration of a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationThread {
    pub id: ThreadId,

    /// System/persona instruction text
    #[serde(default)]
    pub persona: String,

    /// Enabled extension identifiers, in display order
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Per-thread model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,

    /// Owner of the thread
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<UserIdentity>,
}

impl ConversationThread {
    pub fn new(id: ThreadId) -> Self {
        Self {
            id,
            persona: String::new(),
            extensions: Vec::new(),
            model_override: None,
            owner: None,
        }
    }

    /// Whether the given extension is enabled on this thread.
    pub fn has_extension(&self, id: &str) -> bool {
        self.extensions.iter().any(|e| e == id)
    }
}

/// One indexed excerpt of a document uploaded to a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Document name shown in citations
    pub source: String,

    /// Excerpt text
    pub content: String,
}
