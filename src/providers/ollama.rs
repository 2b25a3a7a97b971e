use async_trait::async_trait;
use reqwest::Client;

use crate::error::Result;
use crate::llm_manager::{ChatMessage, LLMProvider};
use crate::providers::{chat_completion, http_client};

/// Local Ollama server through its OpenAI-compatible endpoint
pub struct OllamaProvider {
    model: String,
    base_url: String,
    client: Client,
}

impl OllamaProvider {
    pub fn new(model: Option<String>, base_url: Option<String>) -> Self {
        Self {
            model: model.unwrap_or_else(|| "qwen3:8b".to_string()),
            base_url: base_url.unwrap_or_else(|| "http://localhost:11434".to_string()),
            client: http_client(),
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "Ollama"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let request = self.client.post(format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        ));
        chat_completion(self.name(), request, &self.model, messages, temperature).await
    }
}
