//! Dating-coach features built on the same gateway as the chat pipeline.
//!
//! Unlike [`ChatPipeline`](crate::pipeline::ChatPipeline), the coach keeps no
//! history of its own: callers pass the turns to analyse. Gateway failures
//! are returned as errors.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use wingman_config::AppConfig;
use wingman_core::error::{Error, GatewayError, ValidationError};
use wingman_core::gateway::{Attachment, CompletionRequest, Gateway};
use wingman_core::persona::{ChatPlatform, MatchProfile, UserProfile};
use wingman_core::turn::{Role, Turn};

use crate::context::{ContextWindow, DEFAULT_WINDOW_SIZE, RoleLabels};
use crate::pipeline::{DEFAULT_TIMEOUT, effective_timeout, invoke_bounded};

/// Instruction sent with a photo for feedback.
pub const PHOTO_INSTRUCTION: &str = "You are an experienced dating coach and psychologist who helps people with dating and relationships. \
Your answers should be useful, supportive and based on the principles of healthy relationships. \
Rate how attractive this photo is for a dating profile, \
describe its strengths and weaknesses and give recommendations for improvement. Be as brief and concise as possible.";

pub struct Coach {
    gateway: Arc<dyn Gateway>,
    window: ContextWindow,
    timeout: Duration,
    language: String,
}

impl Coach {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            window: ContextWindow::new(DEFAULT_WINDOW_SIZE, RoleLabels::new("Guy", "Girl")),
            timeout: DEFAULT_TIMEOUT,
            language: "English".into(),
        }
    }

    pub fn from_config(config: &AppConfig, gateway: Arc<dyn Gateway>) -> Self {
        Self::new(gateway)
            .with_window_size(config.conversation.window_size)
            .with_timeout(Duration::from_secs(config.gateway.timeout_secs))
            .with_language(config.persona.language.clone())
    }

    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window = ContextWindow::new(size, self.window.labels().clone());
        self
    }

    pub fn with_labels(mut self, labels: RoleLabels) -> Self {
        self.window = self.window.with_labels(labels);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Language the advice is written in.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn window(&self) -> &ContextWindow {
        &self.window
    }

    /// Best-friend advice on how to answer `last_message`.
    pub async fn suggest_reply(&self, turns: &[Turn], last_message: &str) -> Result<String, Error> {
        let last_message = non_blank(last_message, ValidationError::EmptyMessage)?;
        let history = self.window.render(turns);

        let system = format!(
            "You are a dating expert. Here is the conversation so far:\n{history}\n\n\
             Give short advice on how the guy should answer this message to make a good impression. \
             Talk to the user like a best friend and give practical advice. Answer in {}.",
            self.language
        );
        let prompt = format!("Her last message: {last_message}");

        self.ask("suggest_reply", CompletionRequest::new(system, prompt))
            .await
    }

    /// A free-form question to the coach, answered with no conversation
    /// context.
    pub async fn ask_question(&self, question: &str) -> Result<String, Error> {
        let question = non_blank(question, ValidationError::EmptyMessage)?;

        let system = format!(
            "You are an experienced dating coach. Answer questions about dating, flirting and \
             relationships honestly and practically, with concrete examples where they help. \
             Keep it short and friendly. Answer in {}.",
            self.language
        );

        self.ask("ask_question", CompletionRequest::new(system, question))
            .await
    }

    /// Strengths, weak spots and rewrites for a dating profile.
    pub async fn analyze_profile(
        &self,
        user: &UserProfile,
        profile_text: &str,
    ) -> Result<String, Error> {
        let profile_text = non_blank(profile_text, ValidationError::EmptyProfile)?;

        let system = format!(
            "You are a personal online dating expert. Analyse the profile with the user's personality in mind. \
             Answer in {}.",
            self.language
        );
        let prompt = format!(
            "ABOUT THE USER:\n{about}\n\nPROFILE TO ANALYSE:\n{profile_text}\n\n\
             Give a PERSONALISED analysis with these sections:\n\
             1. Strengths\n\
             2. What can be improved\n\
             3. Personal recommendations\n\
             4. Examples of better wording (\"Instead of: ...\" / \"Better: ...\")\n\n\
             Take the user's personality and goals into account. Use emoji for visual accents.",
            about = describe_user(user),
        );

        self.ask("analyze_profile", CompletionRequest::new(system, prompt))
            .await
    }

    /// Read the dynamics of a chat with a match and propose three replies.
    pub async fn analyze_conversation(
        &self,
        user: &UserProfile,
        match_profile: &MatchProfile,
        turns: &[Turn],
        new_message: &str,
        sender: Role,
    ) -> Result<String, Error> {
        let new_message = non_blank(new_message, ValidationError::EmptyMessage)?;
        let window = self
            .window
            .with_labels(RoleLabels::new("You", match_profile.name.clone()));
        let history = window.render(turns);
        let sender = window.labels().label(sender);

        let system = format!(
            "You are an expert in dating communication. Analyse the message in the context of the conversation. \
             Answer in {}.",
            self.language
        );
        let prompt = format!(
            "ABOUT THE USER:\n\
             - Personality: {personality}\n\
             - Goals: {goals}\n\n\
             ABOUT THE MATCH:\n\
             - Name: {name}\n\
             - Description: {description}\n\
             - Platform: {platform}\n\n\
             CONVERSATION HISTORY:\n{history}\n\n\
             NEW MESSAGE ({sender}): {new_message}\n\n\
             Give an analysis with these sections:\n\
             1. Conversation dynamics\n\
             2. Subtext\n\
             3. Interest level (as a percentage, with a short explanation)\n\
             4. Reply options: one flirty, one neutral, one serious",
            personality = or_unknown(&user.personality_type),
            goals = or_unknown(&user.dating_goals),
            name = match_profile.name,
            description = or_unknown(&match_profile.description),
            platform = or_unknown(&match_profile.platform),
        );

        self.ask("analyze_conversation", CompletionRequest::new(system, prompt))
            .await
    }

    /// Good and bad opener examples tailored to the user and platform.
    pub async fn generate_examples(
        &self,
        user: &UserProfile,
        platform: ChatPlatform,
    ) -> Result<String, Error> {
        let system = format!(
            "You are a dating coach who writes example messages. Answer in {}.",
            self.language
        );
        let prompt = format!(
            "Create PERSONALISED example messages for meeting people.\n\n\
             YOUR PERSONALITY:\n\
             - Age: {age}\n\
             - Interests: {interests}\n\
             - Goals: {goals}\n\
             - Personality type: {personality}\n\n\
             Context: {context}\n\n\
             Write 3-4 good examples, each with why it works, \
             then 3-4 examples to avoid, each with why it fails.",
            age = user
                .age
                .map(|a| a.to_string())
                .unwrap_or_else(|| "not specified".into()),
            interests = join_or_unknown(&user.interests),
            goals = or_unknown(&user.dating_goals),
            personality = or_unknown(&user.personality_type),
            context = platform.description(),
        );

        self.ask("generate_examples", CompletionRequest::new(system, prompt))
            .await
    }

    /// Multimodal feedback on a profile photo.
    pub async fn photo_feedback(&self, attachment: &Attachment) -> Result<String, Error> {
        debug!(path = %attachment.path.display(), "Requesting photo feedback");
        let call = self
            .gateway
            .invoke_with_attachment(PHOTO_INSTRUCTION, attachment);
        let timeout = effective_timeout(self.gateway.as_ref(), self.timeout);
        let completion = match tokio::time::timeout(timeout, call).await {
            Ok(result) => result?,
            Err(_) => return Err(GatewayError::Timeout { timeout }.into()),
        };
        info!(gateway = self.gateway.name(), "Photo feedback received");
        Ok(completion.text)
    }

    async fn ask(&self, feature: &str, request: CompletionRequest) -> Result<String, Error> {
        debug!(feature, prompt_len = request.user_prompt.len(), "Coach request");
        let completion = invoke_bounded(self.gateway.as_ref(), &request, self.timeout).await?;
        info!(feature, gateway = self.gateway.name(), "Coach reply received");
        Ok(completion.text)
    }
}

fn non_blank(text: &str, error: ValidationError) -> Result<&str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() { Err(error) } else { Ok(trimmed) }
}

fn or_unknown(value: &str) -> &str {
    if value.trim().is_empty() {
        "not specified"
    } else {
        value
    }
}

fn join_or_unknown(values: &[String]) -> String {
    if values.is_empty() {
        "not specified".into()
    } else {
        values.join(", ")
    }
}

fn describe_user(user: &UserProfile) -> String {
    format!(
        "- Name: {}\n- Age: {}\n- Interests: {}\n- Dating goals: {}\n- Personality type: {}",
        or_unknown(&user.name),
        user.age
            .map(|a| a.to_string())
            .unwrap_or_else(|| "not specified".into()),
        join_or_unknown(&user.interests),
        or_unknown(&user.dating_goals),
        or_unknown(&user.personality_type),
    )
}
