//! OpenAI-compatible gateway implementation.
//!
//! Works with DeepSeek, OpenAI, OpenRouter, Ollama, vLLM and any endpoint
//! that exposes `/chat/completions`.
//!
//! Supports:
//! - Chat completions (system instruction + user prompt)
//! - Vision completions with an inline base64 image
//! - Health checks via `/models`

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use wingman_core::error::GatewayError;
use wingman_core::gateway::{Attachment, Completion, CompletionRequest, Gateway, Usage};

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

/// An OpenAI-compatible completion gateway.
pub struct OpenAiCompatGateway {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    vision_model: Option<String>,
    temperature: f32,
    max_tokens: Option<u32>,
    http_timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiCompatGateway {
    /// Create a new OpenAI-compatible gateway.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let http_timeout = Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS);
        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            vision_model: None,
            temperature: 0.8,
            max_tokens: None,
            http_timeout,
            client: build_client(http_timeout),
        }
    }

    /// Create a DeepSeek gateway (convenience constructor).
    pub fn deepseek(api_key: impl Into<String>) -> Self {
        Self::new("deepseek", "https://api.deepseek.com/v1", api_key, "deepseek-chat")
    }

    /// Create an OpenAI gateway (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key, "gpt-4o-mini")
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Model used for attachment calls (defaults to the chat model).
    pub fn with_vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    /// Client-side timeout for a single HTTP exchange.
    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self.client = build_client(timeout);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// JSON body for a plain chat completion.
    fn chat_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system_instruction },
                { "role": "user", "content": request.user_prompt },
            ],
            "temperature": self.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }

    /// JSON body for a vision completion with the image inlined as a data URL.
    fn vision_body(&self, instruction: &str, data_url: &str) -> serde_json::Value {
        let model = self.vision_model.as_deref().unwrap_or(&self.model);
        let mut body = serde_json::json!({
            "model": model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": instruction },
                    { "type": "image_url", "image_url": { "url": data_url } },
                ],
            }],
            "temperature": self.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = self.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }

    async fn post_completion(&self, body: serde_json::Value) -> Result<Completion, GatewayError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(GatewayError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(GatewayError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(gateway = %self.name, status, body = %error_body, "Gateway returned error");
            return Err(GatewayError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::MalformedResponse(format!("Failed to parse response: {e}")))?;

        parse_completion(api_response)
    }

    fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        if e.is_timeout() {
            GatewayError::Timeout {
                timeout: self.http_timeout,
            }
        } else {
            GatewayError::Network(e.to_string())
        }
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to a default HTTP client");
            reqwest::Client::new()
        })
}

fn parse_completion(api_response: ApiResponse) -> Result<Completion, GatewayError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::MalformedResponse("No choices in response".into()))?;

    let raw = choice.message.content.unwrap_or_default();
    let text = extract_reply_text(&raw);
    if text.is_empty() {
        return Err(GatewayError::MalformedResponse("Empty completion".into()));
    }

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(Completion {
        text,
        model: api_response.model,
        usage,
    })
}

/// Normalize model output into plain reply text.
///
/// Strips a surrounding Markdown code fence (with or without a `json` tag)
/// and unwraps a `{"text": "..."}` object. Anything else is returned trimmed.
pub fn extract_reply_text(raw: &str) -> String {
    let mut body = raw.trim();

    if let Some(rest) = body.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        body = rest.strip_suffix("```").unwrap_or(rest).trim();
    }

    if body.starts_with('{') {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
            if let Some(serde_json::Value::String(text)) = map.get("text") {
                return text.trim().to_string();
            }
        }
    }

    body.to_string()
}

/// Read an image attachment and encode it as a `data:` URL.
pub async fn attachment_data_url(attachment: &Attachment) -> Result<String, GatewayError> {
    let bytes = tokio::fs::read(&attachment.path).await.map_err(|e| {
        GatewayError::Attachment(format!("{}: {e}", attachment.path.display()))
    })?;
    if bytes.is_empty() {
        return Err(GatewayError::Attachment(format!(
            "{}: file is empty",
            attachment.path.display()
        )));
    }
    Ok(format!(
        "data:{};base64,{}",
        attachment.mime_type,
        STANDARD.encode(&bytes)
    ))
}

#[async_trait]
impl Gateway for OpenAiCompatGateway {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, request: &CompletionRequest) -> Result<Completion, GatewayError> {
        if self.api_key.is_empty() {
            return Err(GatewayError::NotConfigured(format!(
                "no API key for gateway '{}'",
                self.name
            )));
        }

        debug!(gateway = %self.name, model = %self.model, "Sending completion request");
        self.post_completion(self.chat_body(request)).await
    }

    async fn invoke_with_attachment(
        &self,
        instruction: &str,
        attachment: &Attachment,
    ) -> Result<Completion, GatewayError> {
        if self.api_key.is_empty() {
            return Err(GatewayError::NotConfigured(format!(
                "no API key for gateway '{}'",
                self.name
            )));
        }

        let data_url = attachment_data_url(attachment).await?;
        debug!(
            gateway = %self.name,
            mime = %attachment.mime_type,
            encoded_len = data_url.len(),
            "Sending vision request"
        );
        self.post_completion(self.vision_body(instruction, &data_url))
            .await
    }

    async fn health_check(&self) -> Result<bool, GatewayError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        Ok(response.status().is_success())
    }
}

// --- OpenAI API types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
