use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{ExtractError, Result};
use crate::providers::{
    anthropic::AnthropicProvider, ollama::OllamaProvider, openai::OpenAIProvider,
    openrouter::OpenRouterProvider,
};

/// Default wait for a single completion.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Shortest timeout accepted from configuration.
pub const MIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
        }
    }
}

/// One role-tagged message sent to a completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Trait representing a completion endpoint.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Model name of the provider.
    fn model_name(&self) -> &str {
        "Unknown"
    }

    /// Send the messages and return the completion text.
    ///
    /// Transport failures map to `UpstreamUnavailable`, explicit error
    /// responses to `UpstreamRejected`.
    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String>;
}

/// Holds the configured providers and enforces the per-call timeout.
pub struct LLMManager {
    providers: Vec<Box<dyn LLMProvider>>,
    timeout: Duration,
}

impl LLMManager {
    /// Create a new manager with the given providers.
    pub fn new(providers: Vec<Box<dyn LLMProvider>>) -> Self {
        Self {
            providers,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build providers for every enabled entry in the config, in priority
    /// order. Providers whose API key is missing are skipped with a warning.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut providers: Vec<Box<dyn LLMProvider>> = Vec::new();
        let ai = &config.ai_providers;

        if let Some(cfg) = ai.openai.as_ref().filter(|c| c.enabled) {
            match OpenAIProvider::new(Some(cfg.model.clone()), cfg.base_url.clone()) {
                Ok(p) => providers.push(Box::new(p)),
                Err(e) => warn!("Skipping OpenAI provider: {}", e),
            }
        }
        if let Some(cfg) = ai.anthropic.as_ref().filter(|c| c.enabled) {
            match AnthropicProvider::new(Some(cfg.model.clone()), cfg.base_url.clone()) {
                Ok(p) => providers.push(Box::new(p)),
                Err(e) => warn!("Skipping Anthropic provider: {}", e),
            }
        }
        if let Some(cfg) = ai.openrouter.as_ref().filter(|c| c.enabled) {
            match OpenRouterProvider::new(Some(cfg.model.clone()), cfg.base_url.clone()) {
                Ok(p) => providers.push(Box::new(p)),
                Err(e) => warn!("Skipping OpenRouter provider: {}", e),
            }
        }
        if let Some(cfg) = ai.ollama.as_ref().filter(|c| c.enabled) {
            providers.push(Box::new(OllamaProvider::new(
                Some(cfg.model.clone()),
                cfg.base_url.clone(),
            )));
        }

        if providers.is_empty() {
            return Err(ExtractError::InvalidRequest(
                "no enabled completion provider (check config and API keys)".to_string(),
            ));
        }

        let mut timeout = Duration::from_secs(config.extraction.timeout_secs);
        if timeout < MIN_TIMEOUT {
            warn!(
                "extraction.timeout_secs = {} is too short; using {}s",
                config.extraction.timeout_secs,
                MIN_TIMEOUT.as_secs()
            );
            timeout = MIN_TIMEOUT;
        }

        Ok(Self::new(providers).with_timeout(timeout))
    }

    /// Get the active provider.
    pub fn provider(&self) -> Option<&dyn LLMProvider> {
        self.providers.first().map(|p| p.as_ref())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one completion request to the active provider. Never retries.
    pub async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let provider = self.provider().ok_or_else(|| {
            ExtractError::UpstreamUnavailable("no providers available".to_string())
        })?;

        let timeout = self.timeout();
        info!(
            "Requesting completion from {} ({}), timeout {}s",
            provider.name(),
            provider.model_name(),
            timeout.as_secs_f32()
        );

        let result = match tokio::time::timeout(timeout, provider.complete(messages, temperature)).await {
            Ok(result) => result,
            Err(_) => Err(ExtractError::UpstreamUnavailable(format!(
                "{} did not answer within {}s",
                provider.name(),
                timeout.as_secs_f32()
            ))),
        };

        match &result {
            Ok(text) => debug!("{} returned {} characters", provider.name(), text.len()),
            Err(e) => warn!("{} call failed: {}", provider.name(), e),
        }

        result
    }
}
