use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{ExtractError, Result};
use crate::llm_manager::{ChatMessage, LLMProvider, Role};
use crate::providers::{http_client, rejection};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
    #[serde(rename = "type")]
    content_type: String,
}

/// Anthropic messages API provider
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    max_tokens: usize,
}

impl AnthropicProvider {
    pub fn new(model: Option<String>, base_url: Option<String>) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY").map_err(|_| {
            ExtractError::InvalidRequest(
                "ANTHROPIC_API_KEY environment variable not set".to_string(),
            )
        })?;
        let mut provider = Self::with_config(
            api_key,
            model.unwrap_or_else(|| "claude-sonnet-4-0".to_string()),
            1024,
        );
        if let Some(url) = base_url {
            provider.base_url = url;
        }
        Ok(provider)
    }

    pub fn with_config(api_key: String, model: String, max_tokens: usize) -> Self {
        Self {
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: http_client(),
            max_tokens,
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

#[async_trait]
impl LLMProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "Anthropic"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        // System prompts travel in a top-level field rather than as a message.
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let request = AnthropicRequest {
            model: &self.model,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| AnthropicMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.max_tokens,
            temperature: temperature.min(1.0),
        };

        let response = self
            .client
            .post(format!("{}/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractError::from_transport(self.name(), e))?;

        if !response.status().is_success() {
            return Err(rejection(self.name(), response).await);
        }

        let api_response: AnthropicResponse = response.json().await.map_err(|e| {
            ExtractError::UpstreamUnavailable(format!("malformed Anthropic response: {}", e))
        })?;
        debug!("Anthropic stop reason: {:?}", api_response.stop_reason);

        if api_response.stop_reason.as_deref() == Some("max_tokens") {
            warn!(
                "Anthropic response was truncated at {} tokens; the JSON object may be incomplete",
                self.max_tokens
            );
        }

        api_response
            .content
            .into_iter()
            .find(|c| c.content_type == "text")
            .map(|c| c.text)
            .ok_or_else(|| {
                ExtractError::UpstreamUnavailable("no text content in Anthropic response".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_system_prompt_sent_top_level() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test_key"))
            .and(body_partial_json(serde_json::json!({
                "system": "extract fields",
                "messages": [{"role": "user", "content": "Call mom"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [{"type": "text", "text": "{\"title\":\"Call mom\"}"}],
                "stop_reason": "end_turn"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider = AnthropicProvider::with_config("test_key".into(), "claude-sonnet-4-0".into(), 256)
            .with_base_url(server.uri());
        let text = provider
            .complete(
                &[ChatMessage::system("extract fields"), ChatMessage::user("Call mom")],
                0.0,
            )
            .await
            .unwrap();
        assert_eq!(text, r#"{"title":"Call mom"}"#);
    }

    #[tokio::test]
    async fn test_overloaded_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(serde_json::json!({
                "type": "error",
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;

        let provider = AnthropicProvider::with_config("k".into(), "m".into(), 256)
            .with_base_url(server.uri());
        let err = provider
            .complete(&[ChatMessage::user("Call mom")], 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UpstreamRejected { status: 529, .. }));
    }
}
