//! File-based history backend: one JSON document per conversation.
//!
//! Each conversation is stored as a JSON array of `{role, text, timestamp}`
//! objects in its own file under a history directory. Older files that use
//! `message` instead of `text` are still readable.
//!
//! Storage location: `~/.wingman/history/<identity>.json`
//!
//! Writes go to a sibling temp file which is then renamed over the target,
//! so a crash mid-write leaves either the previous or the new sequence.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use wingman_core::error::PersistenceError;
use wingman_core::history::HistoryBackend;
use wingman_core::turn::{ConversationId, Turn};

/// A file-backed history store.
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "File history backend ready");
        Self { dir }
    }

    /// Default directory: `~/.wingman/history`
    pub fn default_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".wingman").join("history")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `id`'s history.
    pub fn path_for(&self, id: &ConversationId) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(id.as_str())))
    }
}

/// Map an identity onto a file stem that is safe on every platform.
///
/// Alphanumerics (any script) and `-` pass through; every other byte is
/// written as `_xx`. The mapping is injective, so distinct identities never
/// share a file.
fn file_stem(identity: &str) -> String {
    let mut stem = String::with_capacity(identity.len());
    for ch in identity.chars() {
        if ch.is_alphanumeric() || ch == '-' {
            stem.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                stem.push_str(&format!("_{byte:02x}"));
            }
        }
    }
    if stem.is_empty() {
        stem.push('_');
    }
    stem
}

fn io_error(id: &ConversationId, e: std::io::Error) -> PersistenceError {
    PersistenceError::Io {
        identity: id.to_string(),
        reason: e.to_string(),
    }
}

#[async_trait]
impl HistoryBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, id: &ConversationId) -> Result<Option<Vec<Turn>>, PersistenceError> {
        let path = self.path_for(id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error(id, e)),
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        let turns: Vec<Turn> = serde_json::from_str(&content).map_err(|e| {
            warn!(path = %path.display(), error = %e, "History file is not valid");
            PersistenceError::Corrupt {
                identity: id.to_string(),
                reason: e.to_string(),
            }
        })?;

        if let Some(pos) = turns.iter().position(|t| t.text.trim().is_empty()) {
            return Err(PersistenceError::Corrupt {
                identity: id.to_string(),
                reason: format!("turn {pos} has empty text"),
            });
        }

        debug!(identity = %id, count = turns.len(), "History loaded from disk");
        Ok(Some(turns))
    }

    async fn save(&self, id: &ConversationId, turns: &[Turn]) -> Result<(), PersistenceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error(id, e))?;

        let content = serde_json::to_string_pretty(turns)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        let path = self.path_for(id);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content.as_bytes())
            .await
            .map_err(|e| io_error(id, e))?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_error(id, e));
        }

        debug!(identity = %id, count = turns.len(), "History saved");
        Ok(())
    }

    async fn remove(&self, id: &ConversationId) -> Result<(), PersistenceError> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(id, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wingman_core::turn::Role;

    fn temp_backend() -> (FileBackend, TempDir) {
        let dir = TempDir::new().unwrap();
        let backend = FileBackend::new(dir.path().join("history"));
        (backend, dir)
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let (backend, _dir) = temp_backend();
        let id = ConversationId::from("Anna");
        let turns = vec![Turn::user("Hi!").unwrap(), Turn::assistant("Hey :)").unwrap()];

        backend.save(&id, &turns).await.unwrap();
        let loaded = backend.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded, turns);
    }

    #[tokio::test]
    async fn survives_backend_recreation() {
        let dir = TempDir::new().unwrap();
        let id = ConversationId::from("anna");
        {
            let backend = FileBackend::new(dir.path());
            backend.save(&id, &[Turn::user("Remember me").unwrap()]).await.unwrap();
        }
        let backend = FileBackend::new(dir.path());
        let loaded = backend.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded[0].text, "Remember me");
    }

    #[tokio::test]
    async fn missing_file_is_none() {
        let (backend, _dir) = temp_backend();
        assert!(backend.load(&ConversationId::from("nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn garbage_file_is_corrupt() {
        let (backend, _dir) = temp_backend();
        let id = ConversationId::from("anna");
        std::fs::create_dir_all(backend.dir()).unwrap();
        std::fs::write(backend.path_for(&id), "{ this is not json").unwrap();

        let err = backend.load(&id).await.unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { identity, .. } if identity == "anna"));
    }

    #[tokio::test]
    async fn empty_text_in_file_is_corrupt() {
        let (backend, _dir) = temp_backend();
        let id = ConversationId::from("anna");
        std::fs::create_dir_all(backend.dir()).unwrap();
        std::fs::write(
            backend.path_for(&id),
            r#"[{"role":"user","text":"  ","timestamp":"2026-01-01T00:00:00Z"}]"#,
        )
        .unwrap();

        assert!(matches!(
            backend.load(&id).await.unwrap_err(),
            PersistenceError::Corrupt { .. }
        ));
    }

    #[tokio::test]
    async fn legacy_message_files_load() {
        let (backend, _dir) = temp_backend();
        let id = ConversationId::from("anna");
        std::fs::create_dir_all(backend.dir()).unwrap();
        std::fs::write(
            backend.path_for(&id),
            r#"[{"role":"user","message":"Привет","timestamp":"2026-01-01T10:00:00Z"},
               {"role":"assistant","message":"Привет! Как дела?","timestamp":"2026-01-01T10:00:05Z"}]"#,
        )
        .unwrap();

        let loaded = backend.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].role, Role::Assistant);
        assert_eq!(loaded[1].text, "Привет! Как дела?");
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file() {
        let (backend, _dir) = temp_backend();
        let id = ConversationId::from("anna");
        backend.save(&id, &[Turn::user("one").unwrap()]).await.unwrap();
        backend
            .save(&id, &[Turn::user("one").unwrap(), Turn::assistant("two").unwrap()])
            .await
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(backend.dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["anna.json".to_string()]);
        assert_eq!(backend.load(&id).await.unwrap().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (backend, _dir) = temp_backend();
        let id = ConversationId::from("anna");
        backend.save(&id, &[Turn::user("bye").unwrap()]).await.unwrap();

        backend.remove(&id).await.unwrap();
        backend.remove(&id).await.unwrap();
        assert!(backend.load(&id).await.unwrap().is_none());
    }

    #[test]
    fn file_stems_are_safe_and_distinct() {
        assert_eq!(file_stem("anna"), "anna");
        assert_eq!(file_stem("Анна"), "Анна");
        assert_eq!(file_stem("../etc"), "_2e_2e_2fetc");
        assert_ne!(file_stem("a b"), file_stem("a_b"));
        assert_eq!(file_stem(""), "_");
    }

    #[tokio::test]
    async fn identities_do_not_share_files() {
        let (backend, _dir) = temp_backend();
        let a = ConversationId::from("room/1");
        let b = ConversationId::from("room_1");
        backend.save(&a, &[Turn::user("to a").unwrap()]).await.unwrap();
        backend.save(&b, &[Turn::user("to b").unwrap()]).await.unwrap();

        assert_eq!(backend.load(&a).await.unwrap().unwrap()[0].text, "to a");
        assert_eq!(backend.load(&b).await.unwrap().unwrap()[0].text, "to b");
    }
}
