//! The chat pipeline: one reply per incoming message.
//!
//! `respond` runs: validate the message, append the user turn, render the
//! trailing window (new turn included), assemble the prompt, call the gateway
//! under a timeout, record the reply. Calls for the same conversation are
//! serialized; different conversations run in parallel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use wingman_config::AppConfig;
use wingman_core::error::{Error, GatewayError, PersistenceError};
use wingman_core::gateway::{Completion, CompletionRequest, Gateway, Usage};
use wingman_core::history::HistoryBackend;
use wingman_core::persona::Persona;
use wingman_core::turn::{ConversationId, Role, Turn};
use wingman_memory::TurnStore;

use crate::context::{ContextWindow, DEFAULT_WINDOW_SIZE, RoleLabels};
use crate::prompt::{AssembledPrompt, PromptAssembler};
use crate::recorder::ReplyRecorder;

/// Default upper bound on one gateway call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Whether a reply came from the model or is the fallback marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Degraded,
}

/// What `respond` hands back to the caller.
#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub status: ReplyStatus,

    /// Why the reply is degraded, if it is
    pub error: Option<GatewayError>,

    /// Turns that are in memory but could not be persisted
    pub warnings: Vec<PersistenceError>,

    pub usage: Option<Usage>,
}

impl Reply {
    pub fn is_degraded(&self) -> bool {
        self.status == ReplyStatus::Degraded
    }
}

/// Observable state of one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    Idle,
    AwaitingReply,
}

/// Turn counts for one conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversationStats {
    pub total: usize,
    pub user: usize,
    pub assistant: usize,
}

impl ConversationStats {
    pub fn of(turns: &[Turn]) -> Self {
        let user = turns.iter().filter(|t| t.role == Role::User).count();
        Self {
            total: turns.len(),
            user,
            assistant: turns.len() - user,
        }
    }
}

struct Session {
    store: tokio::sync::Mutex<TurnStore>,
    awaiting: AtomicBool,
}

/// Clears the awaiting flag when the call finishes or its future is dropped.
struct AwaitingGuard<'a>(&'a AtomicBool);

impl<'a> AwaitingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for AwaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

type SessionSlot = Arc<OnceCell<Arc<Session>>>;

/// Persona chat with per-conversation memory.
pub struct ChatPipeline {
    gateway: Arc<dyn Gateway>,
    backend: Arc<dyn HistoryBackend>,
    assembler: PromptAssembler,
    window: ContextWindow,
    recorder: ReplyRecorder,
    timeout: Duration,
    sessions: Mutex<HashMap<ConversationId, SessionSlot>>,
}

impl ChatPipeline {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        backend: Arc<dyn HistoryBackend>,
        persona: Persona,
    ) -> Self {
        let window = ContextWindow::new(
            DEFAULT_WINDOW_SIZE,
            RoleLabels::new("User", persona.name.clone()),
        );
        Self {
            gateway,
            backend,
            assembler: PromptAssembler::new(persona),
            window,
            recorder: ReplyRecorder::new(wingman_config::DEFAULT_FALLBACK_MARKER),
            timeout: DEFAULT_TIMEOUT,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Build a pipeline from configuration.
    pub fn from_config(
        config: &AppConfig,
        gateway: Arc<dyn Gateway>,
        backend: Arc<dyn HistoryBackend>,
    ) -> Self {
        Self::new(gateway, backend, config.persona.clone())
            .with_window_size(config.conversation.window_size)
            .with_user_label(config.conversation.user_label.clone())
            .with_fallback_marker(config.conversation.fallback_marker.clone())
            .with_timeout(Duration::from_secs(config.gateway.timeout_secs))
    }

    /// Set how many trailing turns are rendered into each prompt.
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window = ContextWindow::new(size, self.window.labels().clone());
        self
    }

    /// Set the label used for the user's lines in rendered history.
    pub fn with_user_label(mut self, label: impl Into<String>) -> Self {
        let assistant = self.window.labels().assistant.clone();
        self.window = self.window.with_labels(RoleLabels::new(label, assistant));
        self
    }

    pub fn with_fallback_marker(mut self, marker: impl Into<String>) -> Self {
        self.recorder = ReplyRecorder::new(marker);
        self
    }

    /// Set the upper bound on a single gateway call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn persona(&self) -> &Persona {
        self.assembler.persona()
    }

    pub fn window(&self) -> &ContextWindow {
        &self.window
    }

    pub fn fallback_marker(&self) -> &str {
        self.recorder.fallback_marker()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reply to `text` in the conversation `identity`.
    ///
    /// Returns `Err` only for invalid input, before anything is recorded.
    /// A gateway failure yields a degraded reply carrying the fallback
    /// marker; the user's turn stays recorded and no assistant turn is added.
    pub async fn respond(&self, identity: &ConversationId, text: &str) -> Result<Reply, Error> {
        self.assembler.validate(text)?;
        let session = self.session(identity).await;
        let mut store = session.store.lock().await;

        let mut warnings = Vec::new();
        let appended = store.append(Role::User, text).await?;
        warnings.extend(appended.warning);

        let context = self.window.render(store.all());
        let prompt = self.assembler.build(&context, text)?;

        debug!(
            identity = %identity,
            turns = store.len(),
            window = self.window.size(),
            "Prompt assembled"
        );

        let outcome = {
            let _awaiting = AwaitingGuard::set(&session.awaiting);
            self.invoke(prompt).await
        };

        match outcome {
            Ok(completion) if self.recorder.should_record(&completion.text) => {
                if let Some(appended) = self.recorder.record(&mut store, &completion.text).await? {
                    warnings.extend(appended.warning);
                }
                info!(
                    identity = %identity,
                    turns = store.len(),
                    reply_len = completion.text.len(),
                    "Reply recorded"
                );
                Ok(Reply {
                    text: completion.text,
                    status: ReplyStatus::Ok,
                    error: None,
                    warnings,
                    usage: completion.usage,
                })
            }
            Ok(_) => {
                warn!(identity = %identity, "Gateway returned an unusable reply");
                Ok(self.degraded(
                    GatewayError::MalformedResponse("blank or fallback reply".into()),
                    warnings,
                ))
            }
            Err(e) => {
                warn!(identity = %identity, error = %e, "Gateway call failed, returning fallback");
                Ok(self.degraded(e, warnings))
            }
        }
    }

    /// Say goodbye. Both turns are recorded only when the gateway answers.
    pub async fn farewell(&self, identity: &ConversationId, text: &str) -> Result<Reply, Error> {
        let prompt = self.assembler.farewell(text)?;
        let session = self.session(identity).await;
        let mut store = session.store.lock().await;

        let outcome = {
            let _awaiting = AwaitingGuard::set(&session.awaiting);
            self.invoke(prompt).await
        };

        match outcome {
            Ok(completion) if self.recorder.should_record(&completion.text) => {
                let mut warnings = Vec::new();
                warnings.extend(store.append(Role::User, text).await?.warning);
                if let Some(appended) = self.recorder.record(&mut store, &completion.text).await? {
                    warnings.extend(appended.warning);
                }
                info!(identity = %identity, turns = store.len(), "Farewell recorded");
                Ok(Reply {
                    text: completion.text,
                    status: ReplyStatus::Ok,
                    error: None,
                    warnings,
                    usage: completion.usage,
                })
            }
            Ok(_) => Ok(self.degraded(
                GatewayError::MalformedResponse("blank or fallback reply".into()),
                Vec::new(),
            )),
            Err(e) => {
                warn!(identity = %identity, error = %e, "Farewell failed");
                Ok(self.degraded(e, Vec::new()))
            }
        }
    }

    /// A snapshot of the conversation, oldest first.
    pub async fn history(&self, identity: &ConversationId) -> Vec<Turn> {
        let session = self.session(identity).await;
        let store = session.store.lock().await;
        store.all().to_vec()
    }

    pub async fn stats(&self, identity: &ConversationId) -> ConversationStats {
        let session = self.session(identity).await;
        let store = session.store.lock().await;
        ConversationStats::of(store.all())
    }

    /// Forget the conversation, in memory and on disk.
    ///
    /// The cached session is dropped too, so a reset conversation holds no
    /// memory until it is used again.
    pub async fn reset(&self, identity: &ConversationId) -> Result<(), PersistenceError> {
        let session = self.session(identity).await;
        let mut store = session.store.lock().await;
        store.clear().await?;
        self.sessions().remove(identity);
        Ok(())
    }

    /// Drop the cached session for `identity` without touching its stored
    /// history; the next call reloads it from the backend. Waits for a call in
    /// flight to finish. Returns whether a session was cached.
    pub async fn release(&self, identity: &ConversationId) -> bool {
        let slot = self.sessions().get(identity).cloned();
        let Some(session) = slot.as_deref().and_then(OnceCell::get).cloned() else {
            return self.sessions().remove(identity).is_some();
        };
        let _store = session.store.lock().await;
        let removed = self.sessions().remove(identity).is_some();
        debug!(identity = %identity, "Session released");
        removed
    }

    /// Number of conversations currently held in memory.
    pub fn cached_sessions(&self) -> usize {
        self.sessions().len()
    }

    /// Whether a gateway call is in flight for `identity`.
    pub fn phase(&self, identity: &ConversationId) -> TurnPhase {
        let slot = self.sessions().get(identity).cloned();
        match slot.as_deref().and_then(OnceCell::get) {
            Some(session) if session.awaiting.load(Ordering::SeqCst) => TurnPhase::AwaitingReply,
            _ => TurnPhase::Idle,
        }
    }

    async fn invoke(&self, prompt: AssembledPrompt) -> Result<Completion, GatewayError> {
        invoke_bounded(self.gateway.as_ref(), &prompt.into(), self.timeout).await
    }

    fn degraded(&self, error: GatewayError, warnings: Vec<PersistenceError>) -> Reply {
        Reply {
            text: self.recorder.fallback_marker().to_string(),
            status: ReplyStatus::Degraded,
            error: Some(error),
            warnings,
            usage: None,
        }
    }

    fn sessions(&self) -> std::sync::MutexGuard<'_, HashMap<ConversationId, SessionSlot>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The session for `identity`, loading its history on first use.
    async fn session(&self, identity: &ConversationId) -> Arc<Session> {
        let slot = self.sessions().entry(identity.clone()).or_default().clone();
        slot.get_or_init(|| async {
            let store = TurnStore::open(identity.clone(), self.backend.clone()).await;
            Arc::new(Session {
                store: tokio::sync::Mutex::new(store),
                awaiting: AtomicBool::new(false),
            })
        })
        .await
        .clone()
    }
}

/// The bound actually applied to one call: `timeout`, widened to the
/// gateway's own budget when it has one.
pub fn effective_timeout(gateway: &dyn Gateway, timeout: Duration) -> Duration {
    gateway
        .time_budget()
        .map_or(timeout, |budget| budget.max(timeout))
}

/// Call `gateway` and give up after `timeout` (or the gateway's own budget,
/// if longer).
pub async fn invoke_bounded(
    gateway: &dyn Gateway,
    request: &CompletionRequest,
    timeout: Duration,
) -> Result<Completion, GatewayError> {
    let timeout = effective_timeout(gateway, timeout);
    match tokio::time::timeout(timeout, gateway.invoke(request)).await {
        Ok(result) => result,
        Err(_) => Err(GatewayError::Timeout { timeout }),
    }
}
