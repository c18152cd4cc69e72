//! Shared test doubles for gateway and history tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use wingman_core::error::{GatewayError, PersistenceError};
use wingman_core::gateway::{Attachment, Completion, CompletionRequest, Gateway};
use wingman_core::history::HistoryBackend;
use wingman_core::turn::{ConversationId, Turn};

/// A gateway that returns scripted results in order and records every request.
///
/// Panics if more calls are made than results provided.
pub struct ScriptedGateway {
    results: Mutex<VecDeque<Result<Completion, GatewayError>>>,
    requests: Mutex<Vec<CompletionRequest>>,
    attachments: Mutex<Vec<(String, Attachment)>>,
}

impl ScriptedGateway {
    pub fn new(results: Vec<Result<Completion, GatewayError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
            attachments: Mutex::new(Vec::new()),
        }
    }

    /// Succeeds with each text in turn.
    pub fn replies(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(Completion::text(*t))).collect())
    }

    /// Fails once with `error`.
    pub fn failing(error: GatewayError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn attachments(&self) -> Vec<(String, Attachment)> {
        self.attachments.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len() + self.attachments.lock().unwrap().len()
    }

    fn next(&self) -> Result<Completion, GatewayError> {
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedGateway: no more results scripted"))
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn invoke(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        self.requests.lock().unwrap().push(request.clone());
        self.next()
    }

    async fn invoke_with_attachment(
        &self,
        instruction: &str,
        attachment: &Attachment,
    ) -> Result<Completion, GatewayError> {
        self.attachments
            .lock()
            .unwrap()
            .push((instruction.to_string(), attachment.clone()));
        self.next()
    }
}

/// A gateway that never answers.
pub struct HangingGateway;

#[async_trait]
impl Gateway for HangingGateway {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn invoke(&self, _request: &CompletionRequest) -> Result<Completion, GatewayError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Err(GatewayError::Network("unreachable".into()))
    }
}

/// A gateway that blocks each call until the test releases it.
pub struct GatedGateway {
    pub entered: Notify,
    pub release: Notify,
    reply: String,
}

impl GatedGateway {
    pub fn new(reply: &str) -> Self {
        Self {
            entered: Notify::new(),
            release: Notify::new(),
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl Gateway for GatedGateway {
    fn name(&self) -> &str {
        "gated"
    }

    async fn invoke(&self, _request: &CompletionRequest) -> Result<Completion, GatewayError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Completion::text(self.reply.clone()))
    }
}

/// Echoes the new message back after a short delay.
pub struct EchoGateway {
    pub delay: Duration,
}

#[async_trait]
impl Gateway for EchoGateway {
    fn name(&self) -> &str {
        "echo"
    }

    async fn invoke(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        tokio::time::sleep(self.delay).await;
        let message = request
            .user_prompt
            .split("NEW MESSAGE: ")
            .nth(1)
            .and_then(|rest| rest.split("\n\n").next())
            .unwrap_or_default();
        Ok(Completion::text(format!("echo: {message}")))
    }
}

/// Answers after `delay` and declares `budget` as its own time bound, like a
/// fallback chain does.
pub struct BudgetedGateway {
    pub budget: Duration,
    pub delay: Duration,
}

#[async_trait]
impl Gateway for BudgetedGateway {
    fn name(&self) -> &str {
        "budgeted"
    }

    async fn invoke(&self, _request: &CompletionRequest) -> Result<Completion, GatewayError> {
        tokio::time::sleep(self.delay).await;
        Ok(Completion::text("late but fine"))
    }

    fn time_budget(&self) -> Option<Duration> {
        Some(self.budget)
    }
}

/// A history backend whose writes always fail.
pub struct BrokenDisk;

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
            reason: "disk full".into(),
        })
    }

    async fn remove(&self, _id: &ConversationId) -> Result<(), PersistenceError> {
        Ok(())
    }
}
