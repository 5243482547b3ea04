//! Response strategies and the per-turn classification between them.

use serde::{Deserialize, Serialize};

/// How a turn is answered. Classified fresh for every turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// The user attached an image.
    Multimodal,
    /// The thread has indexed documents.
    ChatWithFile,
    /// Tool-augmented generation, including the CRM direct path.
    Extensions,
}

impl Strategy {
    /// Priority: image attachment, then documents, then extensions.
    pub fn classify(has_attachment: bool, has_documents: bool) -> Self {
        if has_attachment {
            Self::Multimodal
        } else if has_documents {
            Self::ChatWithFile
        } else {
            Self::Extensions
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Multimodal => "multimodal",
            Self::ChatWithFile => "chat_with_file",
            Self::Extensions => "extensions",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
