use log::{debug, info};

use crate::error::Result;
use crate::llm_manager::{ChatMessage, LLMManager};
use crate::schema::{FieldKind, Schema};
use crate::task::{RawModelResponse, TaskFieldRequest};

/// Sends a task description to the completion endpoint with a prompt
/// describing the exact JSON shape wanted back.
pub struct FieldExtractor<'a> {
    llm_manager: &'a LLMManager,
    preamble: String,
}

impl<'a> FieldExtractor<'a> {
    pub fn new(llm_manager: &'a LLMManager) -> Self {
        Self {
            llm_manager,
            preamble: Self::default_preamble(),
        }
    }

    /// Replace the opening instruction; the field contract is always appended.
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = preamble.into();
        self
    }

    /// Issue exactly one completion request for the request's text.
    ///
    /// Unparseable content is not an error here; the raw text is handed on
    /// to the normalizer.
    pub async fn extract(&self, request: &TaskFieldRequest) -> Result<RawModelResponse> {
        let messages = self.build_messages(request);
        info!(
            "Extracting {} field(s) at temperature {}",
            request.schema().fields().len(),
            request.temperature()
        );

        let text = self
            .llm_manager
            .complete(&messages, request.temperature())
            .await?;
        debug!("Raw model response: {}", text);

        Ok(RawModelResponse::new(text))
    }

    pub fn build_messages(&self, request: &TaskFieldRequest) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.build_system_prompt(request.schema())),
            ChatMessage::user(request.text()),
        ]
    }

    pub fn build_system_prompt(&self, schema: &Schema) -> String {
        let mut prompt = format!(
            "{}\n\nExtract the following fields from the user's task description:\n",
            self.preamble
        );

        for field in schema.fields() {
            prompt.push_str(&format!("- \"{}\" ({})", field.name, Self::kind_hint(&field.kind)));
            if let Some(description) = &field.description {
                prompt.push_str(&format!(": {}", description));
            }
            prompt.push('\n');
        }

        let keys = schema
            .field_names()
            .map(|name| format!("\"{}\"", name))
            .collect::<Vec<_>>()
            .join(", ");

        prompt.push_str(&format!(
            r#"
Rules:
- Respond with ONLY a single JSON object whose keys are exactly: {keys}.
- Do not add prose, explanations, or markdown code fences.
- Use JSON syntax: double-quoted strings, true/false, null. Never use any other literal format.
- Use null for an optional field the description does not mention.
- Copy dates and times exactly as the user wrote them (e.g. "tomorrow at 2pm", "next Friday", "June 9"); do not convert them to calendar dates. If both a date and a time are given, combine them into one value."#
        ));

        prompt
    }

    fn kind_hint(kind: &FieldKind) -> String {
        match kind {
            FieldKind::ShortText => "string, required".to_string(),
            FieldKind::TextList => "array of strings, required, may be empty".to_string(),
            FieldKind::OptionalText => "string or null".to_string(),
            FieldKind::DateOrTimeExpression => "date/time expression string or null".to_string(),
            FieldKind::Enum(values) => format!(
                "one of: {}",
                values
                    .iter()
                    .map(|v| format!("\"{}\"", v))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    fn default_preamble() -> String {
        "You are an intelligent task parser for a Getting-Things-Done task list.".to_string()
    }
}
