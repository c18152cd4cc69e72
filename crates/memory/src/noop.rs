//! No-op history backend: conversations live only as long as the process.

use async_trait::async_trait;
use wingman_core::error::PersistenceError;
use wingman_core::history::HistoryBackend;
use wingman_core::turn::{ConversationId, Turn};

/// A no-op history backend that stores nothing.
pub struct NoopHistory;

#[async_trait]
impl HistoryBackend for NoopHistory {
    fn name(&self) -> &str { "none" }

    async fn load(&self, _id: &ConversationId) -> Result<Option<Vec<Turn>>, PersistenceError> {
        Ok(None)
    }

    async fn save(&self, _id: &ConversationId, _turns: &[Turn]) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn remove(&self, _id: &ConversationId) -> Result<(), PersistenceError> {
        Ok(())
    }
}
