//! Configuration loading, validation, and management for Wingman.
//!
//! Loads configuration from `~/.wingman/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use wingman_core::persona::{Persona, UserProfile};

/// Text returned to the caller when no reply could be generated.
pub const DEFAULT_FALLBACK_MARKER: &str = "[Assistant unavailable] The reply could not be generated right now. Your message was saved; please try again.";

/// The root configuration structure.
///
/// Maps directly to `~/.wingman/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Remote call settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Where conversation history is kept
    #[serde(default)]
    pub history: HistoryConfig,

    /// Windowing and reply handling
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Who the assistant speaks as
    #[serde(default)]
    pub persona: Persona,

    /// The coached user's own profile
    #[serde(default)]
    pub user: UserProfile,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "deepseek".into()
}
fn default_model() -> String {
    "deepseek-chat".into()
}
fn default_temperature() -> f32 {
    0.8
}
fn default_max_tokens() -> u32 {
    1024
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("gateway", &self.gateway)
            .field("history", &self.history)
            .field("conversation", &self.conversation)
            .field("persona", &self.persona)
            .field("user", &self.user)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Upper bound on a single remote call, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Providers tried in order after the default one fails
    #[serde(default)]
    pub fallback: Vec<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            fallback: vec![],
        }
    }
}

/// Which history backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackendKind {
    /// One JSON file per conversation
    #[default]
    File,
    /// Process-local only
    Memory,
    /// Nothing kept between calls to the store
    None,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default)]
    pub backend: HistoryBackendKind,

    /// Override for the history directory (default: `~/.wingman/history`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// How many trailing turns are rendered into a prompt
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    #[serde(default = "default_fallback_marker")]
    pub fallback_marker: String,

    /// Label for the user's lines in rendered history
    #[serde(default = "default_user_label")]
    pub user_label: String,
}

fn default_window_size() -> usize {
    10
}
fn default_fallback_marker() -> String {
    DEFAULT_FALLBACK_MARKER.into()
}
fn default_user_label() -> String {
    "User".into()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            fallback_marker: default_fallback_marker(),
            user_label: default_user_label(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.wingman/config.toml).
    ///
    /// Also checks environment variables for API keys:
    /// - `WINGMAN_API_KEY` (highest priority)
    /// - `DEEPSEEK_API_KEY`
    /// - `OPENAI_API_KEY`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("WINGMAN_API_KEY")
                .ok()
                .or_else(|| std::env::var("DEEPSEEK_API_KEY").ok())
                .or_else(|| std::env::var("OPENAI_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("WINGMAN_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("WINGMAN_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".wingman")
    }

    /// Directory for the file history backend.
    pub fn history_dir(&self) -> PathBuf {
        self.history
            .dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("history"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.default_temperature) {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.conversation.window_size == 0 {
            return Err(ConfigError::ValidationError(
                "conversation.window_size must be at least 1".into(),
            ));
        }

        if self.conversation.fallback_marker.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "conversation.fallback_marker must not be empty".into(),
            ));
        }

        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "gateway.timeout_secs must be at least 1".into(),
            ));
        }

        if self.persona.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "persona.name must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available for the default provider, either
    /// globally (config or environment) or in its `[providers.*]` section.
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            || self
                .providers
                .get(&self.default_provider)
                .and_then(|p| p.api_key.as_deref())
                .is_some_and(|k| !k.trim().is_empty())
    }

    /// Generate a default config TOML string (for `onboard` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            gateway: GatewayConfig::default(),
            history: HistoryConfig::default(),
            conversation: ConversationConfig::default(),
            persona: Persona::default(),
            user: UserProfile::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for wingman_core::Error {
    fn from(e: ConfigError) -> Self {
        wingman_core::Error::Config {
            message: e.to_string(),
        }
    }
}
