use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

/// Kind of value a schema field holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    ShortText,
    TextList,
    OptionalText,
    DateOrTimeExpression,
    /// Closed set of legal values, in declaration order.
    Enum(Vec<String>),
}

impl FieldKind {
    /// Required fields are always present in `TaskFields`; optional ones may be null.
    pub fn is_required(&self) -> bool {
        !matches!(self, FieldKind::OptionalText | FieldKind::DateOrTimeExpression)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::ShortText => "short_text",
            FieldKind::TextList => "text_list",
            FieldKind::OptionalText => "optional_text",
            FieldKind::DateOrTimeExpression => "date_or_time_expression",
            FieldKind::Enum(_) => "enum",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Parses the kind names used in config files. `enum` needs its legal
/// values attached afterwards, see [`FieldSpec::from_parts`].
impl FromStr for FieldKind {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "short_text" | "text" => Ok(FieldKind::ShortText),
            "text_list" | "list" => Ok(FieldKind::TextList),
            "optional_text" => Ok(FieldKind::OptionalText),
            "date_or_time_expression" | "date" | "datetime" => Ok(FieldKind::DateOrTimeExpression),
            "enum" => Ok(FieldKind::Enum(Vec::new())),
            other => Err(ExtractError::InvalidRequest(format!(
                "unknown field kind '{}'",
                other
            ))),
        }
    }
}

/// One field the caller wants extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Hint for the model, e.g. "a short task title".
    pub description: Option<String>,
    /// Leading marker stripped from `TextList` entries (e.g. `@` on GTD contexts).
    pub marker: Option<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            description: None,
            marker: None,
        }
    }

    pub fn short_text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::ShortText)
    }

    pub fn text_list(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::TextList)
    }

    pub fn optional_text(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::OptionalText)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::DateOrTimeExpression)
    }

    pub fn enumeration<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(name, FieldKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Build a field from the loose parts found in a config file.
    pub fn from_parts(
        name: &str,
        kind: &str,
        values: &[String],
        description: Option<&str>,
        marker: Option<&str>,
    ) -> Result<Self> {
        let kind = match kind.parse::<FieldKind>()? {
            FieldKind::Enum(_) => FieldKind::Enum(values.to_vec()),
            other => other,
        };
        let mut spec = Self::new(name.trim(), kind);
        spec.description = description.map(str::to_string);
        spec.marker = marker.filter(|m| !m.is_empty()).map(str::to_string);
        Ok(spec)
    }

    /// Legal values when this is an enum field.
    pub fn legal_values(&self) -> Option<&[String]> {
        match &self.kind {
            FieldKind::Enum(values) => Some(values),
            _ => None,
        }
    }
}

/// Ordered set of fields to extract. Validated on construction and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self> {
        if fields.is_empty() {
            return Err(ExtractError::InvalidRequest(
                "schema must declare at least one field".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for field in &fields {
            if field.name.is_empty() {
                return Err(ExtractError::InvalidRequest(
                    "schema field names must not be empty".to_string(),
                ));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(ExtractError::InvalidRequest(format!(
                    "duplicate schema field '{}'",
                    field.name
                )));
            }
            if let FieldKind::Enum(values) = &field.kind {
                if values.is_empty() {
                    return Err(ExtractError::InvalidRequest(format!(
                        "enum field '{}' has no legal values",
                        field.name
                    )));
                }
            }
        }

        Ok(Self { fields })
    }

    /// Title, GTD contexts and a due expression.
    pub fn gtd() -> Self {
        Self {
            fields: Self::gtd_fields(),
        }
    }

    /// The GTD fields plus status, project and goal.
    pub fn full() -> Self {
        let mut fields = Self::gtd_fields();
        fields.push(
            FieldSpec::enumeration("status", ["Backlog", "Next", "In Progress", "Waiting", "Done"])
                .with_description("workflow status of the task"),
        );
        fields.push(
            FieldSpec::optional_text("project")
                .with_description("the project this task belongs to, if mentioned"),
        );
        fields.push(
            FieldSpec::optional_text("goal")
                .with_description("the larger goal this task serves, if mentioned"),
        );
        Self { fields }
    }

    /// Look up a built-in schema by name.
    pub fn preset(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "gtd" | "basic" => Ok(Self::gtd()),
            "full" => Ok(Self::full()),
            other => Err(ExtractError::InvalidRequest(format!(
                "unknown schema preset '{}' (expected 'gtd' or 'full')",
                other
            ))),
        }
    }

    fn gtd_fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::short_text("title").with_description("a short task title"),
            FieldSpec::text_list("contexts")
                .with_description(
                    "GTD-style contexts such as phone, computer, errands, written without the @ symbol",
                )
                .with_marker("@"),
            FieldSpec::date("due").with_description(
                "when the task is due, copied as written, e.g. \"today\", \"June 9\", \"next Friday at 9pm\"",
            ),
        ]
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_duplicate_names() {
        let err = Schema::new(vec![
            FieldSpec::short_text("title"),
            FieldSpec::optional_text("title"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate schema field 'title'"));
    }

    #[test]
    fn test_rejects_empty_enum() {
        let err = Schema::new(vec![FieldSpec::enumeration("status", Vec::<String>::new())])
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidRequest(_)));
    }

    #[test]
    fn test_rejects_empty_schema() {
        assert!(Schema::new(Vec::new()).is_err());
    }

    #[test]
    fn test_presets_pass_validation() {
        for name in ["gtd", "full"] {
            let schema = Schema::preset(name).unwrap();
            assert!(Schema::new(schema.fields().to_vec()).is_ok());
        }
        assert!(Schema::preset("kanban").is_err());
    }

    #[test]
    fn test_full_preset_status_values() {
        let schema = Schema::full();
        let status = schema.field("status").unwrap();
        assert_eq!(
            status.legal_values().unwrap(),
            &["Backlog", "Next", "In Progress", "Waiting", "Done"]
        );
        assert!(status.kind.is_required());
        assert!(!schema.field("project").unwrap().kind.is_required());
    }

    #[test]
    fn test_from_parts() {
        let values = vec!["Low".to_string(), "High".to_string()];
        let spec = FieldSpec::from_parts("priority", "enum", &values, Some("urgency"), None).unwrap();
        assert_eq!(spec.kind, FieldKind::Enum(values));
        assert_eq!(spec.description.as_deref(), Some("urgency"));

        let spec = FieldSpec::from_parts("tags", "text_list", &[], None, Some("")).unwrap();
        assert_eq!(spec.kind, FieldKind::TextList);
        assert_eq!(spec.marker, None);

        assert!(FieldSpec::from_parts("x", "blob", &[], None, None).is_err());
    }
}
