use async_trait::async_trait;
use reqwest::Client;
use std::env;

use crate::error::{ExtractError, Result};
use crate::llm_manager::{ChatMessage, LLMProvider};
use crate::providers::{chat_completion, http_client};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI chat-completions provider
pub struct OpenAIProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl OpenAIProvider {
    /// Create a provider using `OPENAI_API_KEY` from the environment
    pub fn new(model: Option<String>, base_url: Option<String>) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ExtractError::InvalidRequest("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        let provider = Self::with_config(api_key, model.unwrap_or_else(|| "gpt-4o".to_string()));
        Ok(match base_url {
            Some(url) => provider.with_base_url(url),
            None => provider,
        })
    }

    /// Create a provider with an explicit key and model
    pub fn with_config(api_key: String, model: String) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: http_client(),
        }
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key);
        chat_completion(self.name(), request, &self.model, messages, temperature).await
    }
}
