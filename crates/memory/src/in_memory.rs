//! In-memory backend: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use wingman_core::error::PersistenceError;
use wingman_core::history::HistoryBackend;
use wingman_core::turn::{ConversationId, Turn};

/// An in-memory backend that keeps one turn list per conversation.
/// Survives store re-creation within a process, not a restart.
pub struct InMemoryBackend {
    conversations: Arc<RwLock<HashMap<ConversationId, Vec<Turn>>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of conversations currently stored.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryBackend for InMemoryBackend {
    fn name(&self) -> &str { "in_memory" }

    async fn load(&self, id: &ConversationId) -> Result<Option<Vec<Turn>>, PersistenceError> {
        Ok(self.conversations.read().await.get(id).cloned())
    }

    async fn save(&self, id: &ConversationId, turns: &[Turn]) -> Result<(), PersistenceError> {
        self.conversations
            .write()
            .await
            .insert(id.clone(), turns.to_vec());
        Ok(())
    }

    async fn remove(&self, id: &ConversationId) -> Result<(), PersistenceError> {
        self.conversations.write().await.remove(id);
        Ok(())
    }
}
