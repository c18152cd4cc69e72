//! History backend trait: durable mirror of each conversation's turns.
//!
//! The backend is keyed by [`ConversationId`] and knows nothing about the
//! storage medium above it. Implementations: JSON files, in-memory, none.

use async_trait::async_trait;

use crate::error::PersistenceError;
use crate::turn::{ConversationId, Turn};

/// The core HistoryBackend trait.
///
/// Backends must tolerate concurrent calls for *different* identities.
/// Calls for one identity are serialized by the caller.
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    /// The backend name (e.g., "file", "in_memory", "none").
    fn name(&self) -> &str;

    /// Load the stored turns. `Ok(None)` means nothing has been stored yet.
    async fn load(&self, id: &ConversationId) -> Result<Option<Vec<Turn>>, PersistenceError>;

    /// Replace the stored turns with `turns`. Must be atomic: a reader sees
    /// either the previous sequence or the new one.
    async fn save(&self, id: &ConversationId, turns: &[Turn]) -> Result<(), PersistenceError>;

    /// Remove the stored copy. Removing something absent is not an error.
    async fn remove(&self, id: &ConversationId) -> Result<(), PersistenceError>;
}
