//! Turn store: the authoritative, ordered record of one conversation.
//!
//! The in-memory [`Conversation`] is the source of truth; the
//! [`HistoryBackend`] is a durable mirror rewritten after every mutation.
//! Backend failures never roll back the in-memory state. They are handed
//! back to the caller as warnings.

use std::sync::Arc;
use tracing::{debug, info, warn};
use wingman_core::error::{PersistenceError, ValidationError};
use wingman_core::history::HistoryBackend;
use wingman_core::turn::{Conversation, ConversationId, Role, Turn};

use crate::noop::NoopHistory;

/// Outcome of a successful append.
#[derive(Debug, Clone)]
pub struct Appended {
    /// The turn as stored (timestamp possibly clamped)
    pub turn: Turn,

    /// Set when the turn is in memory but the durable copy could not be written
    pub warning: Option<PersistenceError>,
}

/// Per-identity turn store.
pub struct TurnStore {
    conversation: Conversation,
    backend: Arc<dyn HistoryBackend>,
}

impl TurnStore {
    /// Open the store for `identity`, loading any previously persisted turns.
    ///
    /// Never fails: a missing copy starts empty, and an unreadable or corrupt
    /// one is logged and also starts empty. The bad copy is left on disk
    /// until the next successful save replaces it.
    pub async fn open(identity: ConversationId, backend: Arc<dyn HistoryBackend>) -> Self {
        let turns = match backend.load(&identity).await {
            Ok(Some(turns)) => {
                info!(identity = %identity, turns = turns.len(), backend = backend.name(), "Loaded conversation history");
                turns
            }
            Ok(None) => {
                debug!(identity = %identity, "No stored history, starting fresh");
                Vec::new()
            }
            Err(e) => {
                warn!(identity = %identity, error = %e, "Stored history unusable, starting fresh");
                Vec::new()
            }
        };

        Self {
            conversation: Conversation::from_turns(identity, turns),
            backend,
        }
    }

    /// A store with no durable mirror.
    pub fn ephemeral(identity: ConversationId) -> Self {
        Self {
            conversation: Conversation::new(identity),
            backend: Arc::new(NoopHistory),
        }
    }

    pub fn identity(&self) -> &ConversationId {
        &self.conversation.identity
    }

    /// Append a turn and mirror the full sequence to the backend.
    ///
    /// Validation happens before any state changes. A persistence failure is
    /// reported in [`Appended::warning`] and the turn stays recorded.
    pub async fn append(
        &mut self,
        role: Role,
        text: impl Into<String>,
    ) -> Result<Appended, ValidationError> {
        let turn = Turn::new(role, text)?;
        let turn = self.conversation.push(turn).clone();
        let warning = self.persist().await.err();
        Ok(Appended { turn, warning })
    }

    /// Append with an untyped role, e.g. one read from user input.
    pub async fn append_raw(
        &mut self,
        role: &str,
        text: impl Into<String>,
    ) -> Result<Appended, ValidationError> {
        let role: Role = role.parse()?;
        self.append(role, text).await
    }

    /// All turns in insertion order.
    pub fn all(&self) -> &[Turn] {
        self.conversation.turns()
    }

    pub fn len(&self) -> usize {
        self.conversation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversation.is_empty()
    }

    /// Drop every turn and the durable copy. Clearing an empty store is a no-op
    /// that still succeeds. If the durable copy cannot be removed, nothing is
    /// dropped.
    pub async fn clear(&mut self) -> Result<(), PersistenceError> {
        self.backend.remove(self.identity()).await?;
        let dropped = self.conversation.len();
        self.conversation.clear();
        info!(identity = %self.identity(), dropped, "Conversation history cleared");
        Ok(())
    }

    async fn persist(&self) -> Result<(), PersistenceError> {
        self.backend
            .save(self.identity(), self.conversation.turns())
            .await
            .inspect_err(|e| {
                warn!(identity = %self.identity(), error = %e, "Failed to persist history");
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_backend::FileBackend;
    use crate::in_memory::InMemoryBackend;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Backend whose writes always fail.
    struct BrokenDisk;

    #[async_trait]
    impl HistoryBackend for BrokenDisk {
        fn name(&self) -> &str {
            "broken"
        }

        async fn load(&self, _id: &ConversationId) -> Result<Option<Vec<Turn>>, PersistenceError> {
            Ok(None)
        }

        async fn save(&self, id: &ConversationId, _turns: &[Turn]) -> Result<(), PersistenceError> {
            Err(PersistenceError::Io {
                identity: id.to_string(),
                reason: "read-only file system".into(),
            })
        }

        async fn remove(&self, _id: &ConversationId) -> Result<(), PersistenceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn append_preserves_order() {
        let mut store = TurnStore::ephemeral(ConversationId::from("anna"));
        store.append(Role::User, "Hi").await.unwrap();
        store.append(Role::Assistant, "Hello!").await.unwrap();
        store.append(Role::User, "How are you?").await.unwrap();

        let texts: Vec<&str> = store.all().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Hi", "Hello!", "How are you?"]);
        assert!(store.all().windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn empty_text_leaves_store_unchanged() {
        let mut store = TurnStore::ephemeral(ConversationId::from("anna"));
        store.append(Role::User, "Hi").await.unwrap();

        let err = store.append(Role::Assistant, "   ").await.unwrap_err();
        assert_eq!(err, ValidationError::EmptyText);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn unknown_role_is_rejected() {
        let mut store = TurnStore::ephemeral(ConversationId::from("anna"));
        let err = store.append_raw("system", "be nice").await.unwrap_err();
        assert_eq!(err, ValidationError::UnknownRole("system".into()));
        assert!(store.is_empty());

        let ok = store.append_raw("assistant", "Hi there").await.unwrap();
        assert_eq!(ok.turn.role, Role::Assistant);
    }

    #[tokio::test]
    async fn history_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let backend: Arc<dyn HistoryBackend> = Arc::new(FileBackend::new(dir.path()));
        let id = ConversationId::from("anna");

        {
            let mut store = TurnStore::open(id.clone(), backend.clone()).await;
            store.append(Role::User, "Hi").await.unwrap();
            store.append(Role::Assistant, "Hey! How's your day?").await.unwrap();
        }

        let store = TurnStore::open(id, backend).await;
        assert_eq!(store.len(), 2);
        assert_eq!(store.all()[1].text, "Hey! How's your day?");
    }

    #[tokio::test]
    async fn corrupt_history_starts_empty_and_is_replaced() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(FileBackend::new(dir.path()));
        let id = ConversationId::from("anna");
        std::fs::write(backend.path_for(&id), "not json at all").unwrap();

        let mut store = TurnStore::open(id.clone(), backend.clone()).await;
        assert!(store.is_empty());

        let appended = store.append(Role::User, "fresh start").await.unwrap();
        assert!(appended.warning.is_none());
        let on_disk = backend.load(&id).await.unwrap().unwrap();
        assert_eq!(on_disk.len(), 1);
    }

    #[tokio::test]
    async fn persistence_failure_is_a_warning() {
        let mut store = TurnStore::open(ConversationId::from("anna"), Arc::new(BrokenDisk)).await;
        let appended = store.append(Role::User, "Hi").await.unwrap();

        assert!(matches!(appended.warning, Some(PersistenceError::Io { .. })));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let backend = Arc::new(InMemoryBackend::new());
        let id = ConversationId::from("anna");
        let mut store = TurnStore::open(id.clone(), backend.clone()).await;
        store.append(Role::User, "Hi").await.unwrap();

        store.clear().await.unwrap();
        store.clear().await.unwrap();
        assert!(store.is_empty());
        assert!(backend.load(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn identities_are_isolated() {
        let backend: Arc<dyn HistoryBackend> = Arc::new(InMemoryBackend::new());
        let mut anna = TurnStore::open(ConversationId::from("anna"), backend.clone()).await;
        let mut kate = TurnStore::open(ConversationId::from("kate"), backend.clone()).await;

        anna.append(Role::User, "for anna").await.unwrap();
        kate.append(Role::User, "for kate").await.unwrap();

        let anna = TurnStore::open(ConversationId::from("anna"), backend).await;
        assert_eq!(anna.len(), 1);
        assert_eq!(anna.all()[0].text, "for anna");
    }

    /// Backend that keeps whatever it was given and refuses to delete it.
    struct UndeletableDisk(InMemoryBackend);

    #[async_trait]
    impl HistoryBackend for UndeletableDisk {
        fn name(&self) -> &str {
            "undeletable"
        }

        async fn load(&self, id: &ConversationId) -> Result<Option<Vec<Turn>>, PersistenceError> {
            self.0.load(id).await
        }

        async fn save(&self, id: &ConversationId, turns: &[Turn]) -> Result<(), PersistenceError> {
            self.0.save(id, turns).await
        }

        async fn remove(&self, id: &ConversationId) -> Result<(), PersistenceError> {
            Err(PersistenceError::Io {
                identity: id.to_string(),
                reason: "permission denied".into(),
            })
        }
    }

    #[tokio::test]
    async fn failed_clear_keeps_memory_and_disk_in_step() {
        let backend: Arc<dyn HistoryBackend> = Arc::new(UndeletableDisk(InMemoryBackend::new()));
        let id = ConversationId::from("anna");

        let mut store = TurnStore::open(id.clone(), backend.clone()).await;
        store.append(Role::User, "Hi").await.unwrap();
        store.append(Role::Assistant, "Hey!").await.unwrap();

        assert!(matches!(store.clear().await, Err(PersistenceError::Io { .. })));
        assert_eq!(store.len(), 2);

        let reopened = TurnStore::open(id, backend).await;
        assert_eq!(reopened.all(), store.all());
    }
}
