//! Shared wiring: config loading, backend and gateway construction.

use std::sync::Arc;
use wingman_agent::ChatPipeline;
use wingman_config::{AppConfig, HistoryBackendKind};
use wingman_core::{ConversationId, Gateway, HistoryBackend};
use wingman_memory::{FileBackend, InMemoryBackend, NoopHistory};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Load and validate `~/.wingman/config.toml` plus environment overrides.
pub fn load_config() -> CliResult<AppConfig> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    config
        .validate()
        .map_err(|e| format!("Invalid config: {e}"))?;
    Ok(config)
}

/// Fail early with setup instructions when no API key is configured.
pub fn require_api_key(config: &AppConfig) -> CliResult {
    if config.has_api_key() {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    WINGMAN_API_KEY=sk-...    (generic)");
    eprintln!("    DEEPSEEK_API_KEY=sk-...   (DeepSeek)");
    eprintln!("    OPENAI_API_KEY=sk-...     (OpenAI)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}

pub fn history_backend(config: &AppConfig) -> Arc<dyn HistoryBackend> {
    match config.history.backend {
        HistoryBackendKind::File => Arc::new(FileBackend::new(config.history_dir())),
        HistoryBackendKind::Memory => Arc::new(InMemoryBackend::new()),
        HistoryBackendKind::None => Arc::new(NoopHistory),
    }
}

pub fn gateway(config: &AppConfig) -> CliResult<Arc<dyn Gateway>> {
    require_api_key(config)?;
    Ok(wingman_providers::gateway_from_config(config))
}

/// Pipeline that can read and reset history without talking to a model.
pub fn offline_pipeline(config: &AppConfig) -> ChatPipeline {
    let gateway = wingman_providers::gateway_from_config(config);
    ChatPipeline::from_config(config, gateway, history_backend(config))
}

/// The conversation to use: the one named on the command line, or the
/// persona's own.
pub fn identity(config: &AppConfig, requested: Option<String>) -> ConversationId {
    match requested.map(|s| s.trim().to_string()) {
        Some(name) if !name.is_empty() => ConversationId(name),
        _ => ConversationId(config.persona.name.clone()),
    }
}

/// Stored turns of `identity`, used as context by the coaching commands.
pub async fn stored_turns(
    config: &AppConfig,
    identity: Option<String>,
) -> Vec<wingman_core::Turn> {
    let Some(name) = identity else {
        return Vec::new();
    };
    offline_pipeline(config)
        .history(&ConversationId(name))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_defaults_to_persona_name() {
        let config = AppConfig::default();
        assert_eq!(identity(&config, None).as_str(), "Anna");
        assert_eq!(identity(&config, Some("  ".into())).as_str(), "Anna");
        assert_eq!(identity(&config, Some(" room-7 ".into())).as_str(), "room-7");
    }

    #[test]
    fn backend_follows_config() {
        let mut config = AppConfig::default();
        assert_eq!(history_backend(&config).name(), "file");
        config.history.backend = HistoryBackendKind::Memory;
        assert_eq!(history_backend(&config).name(), "in_memory");
        config.history.backend = HistoryBackendKind::None;
        assert_eq!(history_backend(&config).name(), "none");
    }

    #[test]
    fn missing_key_is_reported() {
        let config = AppConfig::default();
        assert!(require_api_key(&config).is_err());
        assert!(gateway(&config).is_err());
    }

    #[tokio::test]
    async fn no_identity_means_no_turns() {
        let config = AppConfig::default();
        assert!(stored_turns(&config, None).await.is_empty());
    }
}
