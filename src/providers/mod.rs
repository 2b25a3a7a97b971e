//! Completion endpoints. OpenAI, OpenRouter and Ollama speak the same
//! chat-completions wire format and share the helpers below.

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod openrouter;

use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};
use crate::llm_manager::ChatMessage;

pub(crate) fn http_client() -> Client {
    reqwest::ClientBuilder::new()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// POST an OpenAI-style chat completion and return the first choice's text.
pub(crate) async fn chat_completion(
    provider: &str,
    request: RequestBuilder,
    model: &str,
    messages: &[ChatMessage],
    temperature: f32,
) -> Result<String> {
    let body = ChatCompletionRequest {
        model,
        messages: messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str(),
                content: &m.content,
            })
            .collect(),
        temperature,
        stream: false,
    };

    let response = request
        .json(&body)
        .send()
        .await
        .map_err(|e| ExtractError::from_transport(provider, e))?;

    if !response.status().is_success() {
        return Err(rejection(provider, response).await);
    }

    let response_text = response
        .text()
        .await
        .map_err(|e| ExtractError::from_transport(provider, e))?;
    debug!("Raw {} response: {}", provider, response_text);

    let parsed: ChatCompletionResponse = serde_json::from_str(&response_text).map_err(|e| {
        ExtractError::UpstreamUnavailable(format!("malformed {} response: {}", provider, e))
    })?;

    let choice = parsed.choices.into_iter().next().ok_or_else(|| {
        ExtractError::UpstreamUnavailable(format!("no choices in {} response", provider))
    })?;

    if let Some(reason) = choice.finish_reason.as_deref() {
        if reason == "length" {
            warn!("{} response was truncated; the JSON object may be incomplete", provider);
        }
    }

    Ok(choice.message.content.unwrap_or_default())
}

/// Turn a non-2xx response into `UpstreamRejected`, preferring the
/// provider's own error message when the body carries one.
pub(crate) async fn rejection(provider: &str, response: Response) -> ExtractError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());

    ExtractError::UpstreamRejected {
        provider: provider.to_string(),
        status,
        message,
    }
}
