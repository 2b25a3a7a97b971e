use chrono::{Local, NaiveDateTime};
use log::info;

use crate::error::Result;
use crate::extractor::FieldExtractor;
use crate::llm_manager::LLMManager;
use crate::normalizer::Normalizer;
use crate::task::{TaskFieldRequest, TaskFields};

/// One extraction: completion request, then normalization. Holds no
/// state between calls.
pub struct TaskParser<'a> {
    extractor: FieldExtractor<'a>,
    normalizer: Normalizer,
}

impl<'a> TaskParser<'a> {
    pub fn new(llm_manager: &'a LLMManager) -> Self {
        Self {
            extractor: FieldExtractor::new(llm_manager),
            normalizer: Normalizer::new(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub async fn parse(&self, request: &TaskFieldRequest) -> Result<TaskFields> {
        self.parse_at(request, Local::now().naive_local()).await
    }

    /// Like [`parse`](Self::parse) with relative dates resolved against `reference`.
    pub async fn parse_at(
        &self,
        request: &TaskFieldRequest,
        reference: NaiveDateTime,
    ) -> Result<TaskFields> {
        let raw = self.extractor.extract(request).await?;
        let fields = self
            .normalizer
            .normalize_at(&raw, request.schema(), reference)?;
        info!(
            "Extracted {} field(s), {} flagged for review",
            fields.iter().count(),
            fields.notes().len()
        );
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use crate::llm_manager::tests::ScriptedProvider;
    use crate::schema::{FieldSpec, Schema};
    use crate::task::DateValue;
    use chrono::NaiveDate;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn manager(reply: &str) -> LLMManager {
        LLMManager::new(vec![Box::new(ScriptedProvider::replying(reply))])
    }

    #[tokio::test]
    async fn test_dentist_tomorrow_at_two() {
        let manager = manager(
            r#"{"title": "Call the dentist", "contexts": ["phone"], "due": "tomorrow at 2pm"}"#,
        );
        let request =
            TaskFieldRequest::new("Call the dentist tomorrow at 2pm", Schema::gtd()).unwrap();

        let fields = TaskParser::new(&manager)
            .parse_at(&request, reference())
            .await
            .unwrap();

        assert_eq!(fields.text("title"), Some("Call the dentist"));
        assert_eq!(fields.list("contexts").unwrap(), &["phone".to_string()]);
        match fields.date("due").unwrap() {
            DateValue::Resolved { at, has_time, .. } => {
                assert!(*has_time);
                assert_eq!(at.date(), NaiveDate::from_ymd_opt(2026, 10, 15).unwrap());
                assert_eq!(at.format("%H:%M").to_string(), "14:00");
            }
            other => panic!("unexpected due value: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fenced_reply_without_due() {
        let manager = manager("```json\n{\"title\":\"Buy milk\",\"contexts\":[]}\n```");
        let request = TaskFieldRequest::new("Buy milk", Schema::gtd()).unwrap();

        let fields = TaskParser::new(&manager)
            .parse_at(&request, reference())
            .await
            .unwrap();
        assert_eq!(fields.text("title"), Some("Buy milk"));
        assert!(fields.get("due").unwrap().is_null());
    }

    #[tokio::test]
    async fn test_prose_reply_fails() {
        let manager = manager("Sounds like you need to buy milk! Anything else?");
        let request = TaskFieldRequest::new("Buy milk", Schema::gtd()).unwrap();

        let err = TaskParser::new(&manager)
            .parse_at(&request, reference())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::ExtractionFailed(_)));
    }

    #[tokio::test]
    async fn test_status_resolves_case() {
        let manager = manager(r#"{"title": "File taxes", "status": "done"}"#);
        let schema = Schema::new(vec![
            FieldSpec::short_text("title"),
            FieldSpec::enumeration("status", ["Backlog", "Next", "Done"]),
        ])
        .unwrap();
        let request = TaskFieldRequest::new("Filed my taxes", schema).unwrap();

        let fields = TaskParser::new(&manager)
            .parse_at(&request, reference())
            .await
            .unwrap();
        assert_eq!(fields.text("status"), Some("Done"));
    }

    #[tokio::test]
    async fn test_upstream_errors_surface_unchanged() {
        let manager = LLMManager::new(vec![Box::new(ScriptedProvider::failing(|| {
            ExtractError::UpstreamUnavailable("connection refused".into())
        }))]);
        let request = TaskFieldRequest::new("Buy milk", Schema::gtd()).unwrap();

        let err = TaskParser::new(&manager).parse(&request).await.unwrap_err();
        assert!(matches!(err, ExtractError::UpstreamUnavailable(_)));
    }
}
