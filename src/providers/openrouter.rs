use async_trait::async_trait;
use reqwest::Client;
use std::env;

use crate::error::{ExtractError, Result};
use crate::llm_manager::{ChatMessage, LLMProvider};
use crate::providers::{chat_completion, http_client};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Debug, Clone)]
pub struct OpenRouterProvider {
    pub model: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenRouterProvider {
    pub fn new(model: Option<String>, base_url: Option<String>) -> Result<Self> {
        let api_key = env::var("OPENROUTER_API_KEY").map_err(|_| {
            ExtractError::InvalidRequest(
                "OPENROUTER_API_KEY environment variable not set".to_string(),
            )
        })?;
        Ok(Self::with_config(
            api_key,
            model.unwrap_or_else(|| "openai/gpt-4o-mini".to_string()),
            base_url,
        ))
    }

    pub fn with_config(api_key: String, model: String, base_url: Option<String>) -> Self {
        Self {
            model,
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: http_client(),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .header("X-Title", "task_parser");
        chat_completion(self.name(), request, &self.model, messages, temperature).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenRouterProvider {
        OpenRouterProvider::with_config(
            "or_key".to_string(),
            "openai/gpt-4o-mini".to_string(),
            Some(format!("{}/api/v1/", server.uri())),
        )
    }

    #[test]
    fn test_defaults_to_public_endpoint() {
        let provider =
            OpenRouterProvider::with_config("k".into(), "openai/gpt-4o-mini".into(), None);
        assert_eq!(provider.base_url, DEFAULT_BASE_URL);
        assert_eq!(provider.model_name(), "openai/gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_sends_key_title_and_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/chat/completions"))
            .and(bearer_token("or_key"))
            .and(header("X-Title", "task_parser"))
            .and(body_partial_json(serde_json::json!({
                "model": "openai/gpt-4o-mini",
                "messages": [{"role": "user", "content": "Water the plants"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"title\":\"Water the plants\"}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider(&server)
            .complete(&[ChatMessage::user("Water the plants")], 0.2)
            .await
            .unwrap();
        assert_eq!(text, r#"{"title":"Water the plants"}"#);
    }

    #[tokio::test]
    async fn test_payment_required_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": {"code": 402, "message": "Insufficient credits"}
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete(&[ChatMessage::user("Water the plants")], 0.0)
            .await
            .unwrap_err();
        match err {
            ExtractError::UpstreamRejected { provider, status, message } => {
                assert_eq!(provider, "openrouter");
                assert_eq!(status, 402);
                assert_eq!(message, "Insufficient credits");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let err = OpenRouterProvider::with_config(
            "k".into(),
            "openai/gpt-4o-mini".into(),
            Some("http://127.0.0.1:9".to_string()),
        )
        .complete(&[ChatMessage::user("Water the plants")], 0.0)
        .await
        .unwrap_err();
        assert!(matches!(err, ExtractError::UpstreamUnavailable(_)));
    }
}
