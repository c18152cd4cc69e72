//! Gateway router: builds the configured gateways and picks the default.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use wingman_config::AppConfig;
use wingman_core::gateway::Gateway;

use crate::fallback::FallbackGateway;
use crate::openai_compat::OpenAiCompatGateway;

/// Named gateways plus the one used by default.
pub struct GatewayRouter {
    gateways: HashMap<String, Arc<dyn Gateway>>,
    default_gateway: String,
}

impl GatewayRouter {
    pub fn new(default_gateway: impl Into<String>) -> Self {
        Self {
            gateways: HashMap::new(),
            default_gateway: default_gateway.into(),
        }
    }

    pub fn register(&mut self, name: impl Into<String>, gateway: Arc<dyn Gateway>) {
        self.gateways.insert(name.into(), gateway);
    }

    /// Get the default gateway.
    pub fn default(&self) -> Option<Arc<dyn Gateway>> {
        self.gateways.get(&self.default_gateway).cloned()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Gateway>> {
        self.gateways.get(name).cloned()
    }

    /// List all registered gateway names.
    pub fn list(&self) -> Vec<&str> {
        self.gateways.keys().map(|s| s.as_str()).collect()
    }
}

/// Build every configured gateway, plus the default one even when it has no
/// explicit `[providers.*]` section.
pub fn build_from_config(config: &AppConfig) -> GatewayRouter {
    let mut router = GatewayRouter::new(&config.default_provider);

    let mut names: Vec<&String> = config.providers.keys().collect();
    if !config.providers.contains_key(&config.default_provider) {
        names.push(&config.default_provider);
    }
    for name in &config.gateway.fallback {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    for name in names {
        router.register(name.clone(), Arc::new(build_gateway(config, name)));
    }

    router
}

/// The gateway the pipeline should talk to: the default provider, wrapped in
/// a fallback chain when `gateway.fallback` names further providers.
pub fn gateway_from_config(config: &AppConfig) -> Arc<dyn Gateway> {
    let router = build_from_config(config);
    let timeout = Duration::from_secs(config.gateway.timeout_secs);

    let primary: Arc<dyn Gateway> = match router.default() {
        Some(gateway) => gateway,
        None => Arc::new(build_gateway(config, &config.default_provider)),
    };

    if config.gateway.fallback.is_empty() {
        return primary;
    }

    let mut chain = FallbackGateway::new(format!("{}+fallback", config.default_provider))
        .add(primary, timeout);
    for name in &config.gateway.fallback {
        if name == &config.default_provider {
            continue;
        }
        if let Some(gateway) = router.get(name) {
            chain = chain.add(gateway, timeout);
        }
    }
    debug!(chain = chain.len(), "Gateway fallback chain built");
    Arc::new(chain)
}

fn build_gateway(config: &AppConfig, name: &str) -> OpenAiCompatGateway {
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();

    let base_url = provider_config
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    let model = provider_config
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| {
            if name == config.default_provider {
                config.default_model.clone()
            } else {
                default_model(name).to_string()
            }
        });

    OpenAiCompatGateway::new(name, base_url, api_key, model)
        .with_temperature(config.default_temperature)
        .with_max_tokens(config.default_max_tokens)
        .with_http_timeout(Duration::from_secs(config.gateway.timeout_secs))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

fn default_model(provider_name: &str) -> &'static str {
    match provider_name {
        "openai" => "gpt-4o-mini",
        "openrouter" => "deepseek/deepseek-chat",
        "ollama" => "llama3.1",
        _ => "deepseek-chat",
    }
}
