//! Gateway trait: the abstraction over remote completion services.
//!
//! A Gateway takes a system instruction plus a user prompt and returns the
//! model's text, or a typed [`GatewayError`]. There is no shared client:
//! each gateway is constructed explicitly and handed to whoever needs it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::GatewayError;

/// The two-part payload sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Persona framing and rules
    pub system_instruction: String,

    /// Context block followed by the new message
    pub user_prompt: String,
}

impl CompletionRequest {
    pub fn new(system_instruction: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_prompt: user_prompt.into(),
        }
    }
}

/// A successful completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text, already trimmed
    pub text: String,

    /// Which model actually responded
    pub model: String,

    /// Token usage statistics, if the service reported them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: String::new(),
            usage: None,
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Image formats accepted for the photo-feedback call.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// An opaque reference to a file sent alongside an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Where the file lives
    pub path: PathBuf,

    /// MIME type, e.g. `image/png`
    pub mime_type: String,
}

impl Attachment {
    /// Build an attachment from an image path, inferring the MIME type from
    /// the extension.
    pub fn image(path: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let mime_type = match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "webp" => "image/webp",
            _ => {
                return Err(GatewayError::Attachment(format!(
                    "unsupported image type '{}' (expected one of: {})",
                    path.display(),
                    IMAGE_EXTENSIONS.join(", ")
                )));
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            mime_type: mime_type.into(),
        })
    }
}

/// The core Gateway trait.
///
/// The pipeline calls `invoke()` without knowing which service is behind it.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// A human-readable name for this gateway (e.g., "deepseek", "openai").
    fn name(&self) -> &str;

    /// Send the payload and wait for the complete reply.
    async fn invoke(&self, request: &CompletionRequest) -> Result<Completion, GatewayError>;

    /// Send a fixed instruction together with an attachment.
    ///
    /// Default implementation reports the operation as unsupported.
    async fn invoke_with_attachment(
        &self,
        _instruction: &str,
        _attachment: &Attachment,
    ) -> Result<Completion, GatewayError> {
        Err(GatewayError::Unsupported(self.name().to_string()))
    }

    /// How long one call may legitimately take when this gateway bounds its
    /// own attempts (a fallback chain, for instance). Callers must not cut a
    /// call shorter than this. `None` means the caller's bound applies.
    fn time_budget(&self) -> Option<Duration> {
        None
    }

    /// Health check: can we reach the service?
    async fn health_check(&self) -> Result<bool, GatewayError> {
        Ok(true)
    }
}
