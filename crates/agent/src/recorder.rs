//! Reply recorder: stores the model's answer as an assistant turn.

use tracing::debug;
use wingman_core::error::ValidationError;
use wingman_core::turn::Role;
use wingman_memory::{Appended, TurnStore};

/// Appends successful replies; ignores blanks and the fallback marker.
#[derive(Debug, Clone)]
pub struct ReplyRecorder {
    fallback_marker: String,
}

impl ReplyRecorder {
    pub fn new(fallback_marker: impl Into<String>) -> Self {
        Self {
            fallback_marker: fallback_marker.into(),
        }
    }

    pub fn fallback_marker(&self) -> &str {
        &self.fallback_marker
    }

    /// Whether `reply` is a real answer worth keeping.
    pub fn should_record(&self, reply: &str) -> bool {
        let reply = reply.trim();
        !reply.is_empty() && !reply.starts_with(self.fallback_marker.trim())
    }

    /// Append `reply` as an assistant turn. Returns `None` when nothing was recorded.
    pub async fn record(
        &self,
        store: &mut TurnStore,
        reply: &str,
    ) -> Result<Option<Appended>, ValidationError> {
        if !self.should_record(reply) {
            debug!(identity = %store.identity(), "Reply not recorded");
            return Ok(None);
        }
        store.append(Role::Assistant, reply).await.map(Some)
    }
}
