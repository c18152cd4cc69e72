//! Gateway fallback: ordered retry chain with per-entry timeouts.
//!
//! Entries are tried in order until one answers. Each attempt is bounded by
//! its entry's own timeout, so the chain as a whole may take up to the sum of
//! them; [`Gateway::time_budget`] reports that sum to callers that wrap the
//! chain in a bound of their own.
//!
//! Attachment calls skip entries that do not support attachments and stop at
//! the first [`GatewayError::Attachment`], since a bad file fails everywhere.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use wingman_core::error::GatewayError;
use wingman_core::gateway::{Attachment, Completion, CompletionRequest, Gateway};

/// Per-entry bound used by [`FallbackGateway::add_default`].
pub const DEFAULT_ENTRY_TIMEOUT: Duration = Duration::from_secs(30);

/// Ordered list of gateways presented as one.
pub struct FallbackGateway {
    name: String,
    chain: Vec<Entry>,
}

struct Entry {
    gateway: Arc<dyn Gateway>,
    timeout: Duration,
}

impl Entry {
    async fn attempt<F>(&self, call: F) -> Result<Completion, GatewayError>
    where
        F: Future<Output = Result<Completion, GatewayError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .unwrap_or(Err(GatewayError::Timeout {
                timeout: self.timeout,
            }))
    }
}

impl FallbackGateway {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chain: Vec::new(),
        }
    }

    /// Append `gateway`, allowing it `timeout` per attempt.
    pub fn add(mut self, gateway: Arc<dyn Gateway>, timeout: Duration) -> Self {
        self.chain.push(Entry { gateway, timeout });
        self
    }

    pub fn add_default(self, gateway: Arc<dyn Gateway>) -> Self {
        self.add(gateway, DEFAULT_ENTRY_TIMEOUT)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    fn empty_chain() -> GatewayError {
        GatewayError::NotConfigured("fallback chain has no gateways".into())
    }
}

#[async_trait]
impl Gateway for FallbackGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        let mut last_error = Self::empty_chain();

        for (position, entry) in self.chain.iter().enumerate() {
            let gateway = entry.gateway.name();
            debug!(chain = %self.name, gateway, position, "Trying gateway");

            match entry.attempt(entry.gateway.invoke(request)).await {
                Ok(completion) => {
                    if position > 0 {
                        info!(chain = %self.name, gateway, position, "Served by fallback gateway");
                    }
                    return Ok(completion);
                }
                Err(e) => {
                    warn!(chain = %self.name, gateway, error = %e, "Gateway failed, moving on");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    async fn invoke_with_attachment(
        &self,
        instruction: &str,
        attachment: &Attachment,
    ) -> Result<Completion, GatewayError> {
        let mut last_error = None;

        for entry in &self.chain {
            let gateway = entry.gateway.name();
            let call = entry.gateway.invoke_with_attachment(instruction, attachment);

            match entry.attempt(call).await {
                Ok(completion) => return Ok(completion),
                Err(GatewayError::Unsupported(_)) => {
                    debug!(chain = %self.name, gateway, "No attachment support, skipping");
                }
                Err(e @ GatewayError::Attachment(_)) => return Err(e),
                Err(e) => {
                    warn!(chain = %self.name, gateway, error = %e, "Attachment call failed, moving on");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => e,
            None if self.chain.is_empty() => Self::empty_chain(),
            None => GatewayError::Unsupported(self.name.clone()),
        })
    }

    fn time_budget(&self) -> Option<Duration> {
        if self.chain.is_empty() {
            return None;
        }
        Some(self.chain.iter().map(|entry| entry.timeout).sum())
    }

    async fn health_check(&self) -> Result<bool, GatewayError> {
        for entry in &self.chain {
            if matches!(entry.gateway.health_check().await, Ok(true)) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Answer(&'static str),
        AnswerAfter(Duration, &'static str),
        Fail(GatewayError),
        Hang,
    }

    /// Follows its script on every call, text or attachment. Text-only stubs
    /// keep the trait's default attachment behaviour.
    struct Stub {
        name: &'static str,
        script: Script,
        sees_images: bool,
        calls: AtomicUsize,
    }

    impl Stub {
        fn new(name: &'static str, script: Script) -> Arc<Self> {
            Arc::new(Self {
                name,
                script,
                sees_images: true,
                calls: AtomicUsize::new(0),
            })
        }

        fn text_only(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                script: Script::Answer("text"),
                sees_images: false,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        async fn run(&self) -> Result<Completion, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.script {
                Script::Answer(text) => Ok(Completion::text(*text)),
                Script::AnswerAfter(delay, text) => {
                    tokio::time::sleep(*delay).await;
                    Ok(Completion::text(*text))
                }
                Script::Fail(e) => Err(e.clone()),
                Script::Hang => std::future::pending().await,
            }
        }
    }

    #[async_trait]
    impl Gateway for Stub {
        fn name(&self) -> &str {
            self.name
        }

        async fn invoke(&self, _request: &CompletionRequest) -> Result<Completion, GatewayError> {
            self.run().await
        }

        async fn invoke_with_attachment(
            &self,
            _instruction: &str,
            _attachment: &Attachment,
        ) -> Result<Completion, GatewayError> {
            if !self.sees_images {
                return Err(GatewayError::Unsupported(self.name.into()));
            }
            self.run().await
        }

        async fn health_check(&self) -> Result<bool, GatewayError> {
            match &self.script {
                Script::Fail(e) => Err(e.clone()),
                _ => Ok(true),
            }
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest::new("You are Anna", "Hi")
    }

    fn photo() -> Attachment {
        Attachment::image("me.png").unwrap()
    }

    #[tokio::test]
    async fn primary_answer_short_circuits() {
        let deepseek = Stub::new("deepseek", Script::Answer("hi from deepseek"));
        let openai = Stub::new("openai", Script::Answer("hi from openai"));
        let chain = FallbackGateway::new("chain")
            .add_default(deepseek.clone())
            .add_default(openai.clone());

        assert_eq!(chain.invoke(&request()).await.unwrap().text, "hi from deepseek");
        assert_eq!((deepseek.calls(), openai.calls()), (1, 0));
    }

    #[tokio::test]
    async fn error_moves_to_next_entry() {
        let deepseek = Stub::new(
            "deepseek",
            Script::Fail(GatewayError::RateLimited { retry_after_secs: 10 }),
        );
        let openai = Stub::new("openai", Script::Answer("hi from openai"));
        let chain = FallbackGateway::new("chain")
            .add_default(deepseek.clone())
            .add_default(openai.clone());

        assert_eq!(chain.invoke(&request()).await.unwrap().text, "hi from openai");
        assert_eq!((deepseek.calls(), openai.calls()), (1, 1));
    }

    #[tokio::test]
    async fn exhausted_chain_reports_last_error() {
        let chain = FallbackGateway::new("chain")
            .add_default(Stub::new("a", Script::Fail(GatewayError::Network("refused".into()))))
            .add_default(Stub::new(
                "b",
                Script::Fail(GatewayError::AuthenticationFailed("bad key".into())),
            ));

        let err = chain.invoke(&request()).await.unwrap_err();
        assert!(matches!(err, GatewayError::AuthenticationFailed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_primary_gives_way_to_slow_backup() {
        let backup = Stub::new("backup", Script::AnswerAfter(Duration::from_secs(2), "made it"));
        let chain = FallbackGateway::new("chain")
            .add(Stub::new("primary", Script::Hang), Duration::from_secs(30))
            .add(backup.clone(), Duration::from_secs(30));

        assert_eq!(chain.invoke(&request()).await.unwrap().text, "made it");
        assert_eq!(backup.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn last_entry_timeout_keeps_its_duration() {
        let chain = FallbackGateway::new("chain")
            .add(Stub::new("slow", Script::Hang), Duration::from_millis(250));

        let err = chain.invoke(&request()).await.unwrap_err();
        assert!(
            matches!(err, GatewayError::Timeout { timeout } if timeout == Duration::from_millis(250))
        );
    }

    #[test]
    fn budget_is_sum_of_entry_timeouts() {
        let chain = FallbackGateway::new("chain")
            .add(Stub::new("a", Script::Hang), Duration::from_secs(30))
            .add(Stub::new("b", Script::Hang), Duration::from_secs(20));
        assert_eq!(chain.time_budget(), Some(Duration::from_secs(50)));
        assert_eq!(FallbackGateway::new("empty").time_budget(), None);
    }

    #[tokio::test]
    async fn empty_chain_is_not_configured() {
        let chain = FallbackGateway::new("empty");
        assert!(chain.is_empty());
        assert!(matches!(
            chain.invoke(&request()).await.unwrap_err(),
            GatewayError::NotConfigured(_)
        ));
        assert!(matches!(
            chain.invoke_with_attachment("Rate it", &photo()).await.unwrap_err(),
            GatewayError::NotConfigured(_)
        ));
    }

    #[tokio::test]
    async fn attachment_skips_text_only_entries() {
        let vision = Stub::new("vision", Script::Answer("nice photo"));
        let chain = FallbackGateway::new("chain")
            .add_default(Stub::text_only("deepseek"))
            .add_default(vision.clone());
        assert_eq!(chain.len(), 2);

        let done = chain.invoke_with_attachment("Rate it", &photo()).await.unwrap();
        assert_eq!(done.text, "nice photo");
        assert_eq!(vision.calls(), 1);
    }

    #[tokio::test]
    async fn attachment_unsupported_everywhere() {
        let chain = FallbackGateway::new("text-chain").add_default(Stub::text_only("deepseek"));
        let err = chain.invoke_with_attachment("Rate it", &photo()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Unsupported(name) if name == "text-chain"));
    }

    #[tokio::test]
    async fn bad_attachment_stops_the_chain() {
        let second = Stub::new("second", Script::Answer("unreachable"));
        let chain = FallbackGateway::new("chain")
            .add_default(Stub::new(
                "first",
                Script::Fail(GatewayError::Attachment("no such file".into())),
            ))
            .add_default(second.clone());

        let err = chain.invoke_with_attachment("Rate it", &photo()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Attachment(_)));
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn healthy_if_any_entry_is() {
        let chain = FallbackGateway::new("chain")
            .add_default(Stub::new("down", Script::Fail(GatewayError::Network("down".into()))))
            .add_default(Stub::new("up", Script::Answer("ok")));
        assert!(chain.health_check().await.unwrap());

        let dead = FallbackGateway::new("dead")
            .add_default(Stub::new("down", Script::Fail(GatewayError::Network("down".into()))));
        assert!(!dead.health_check().await.unwrap());
    }
}
