use std::fs;
use std::path::Path;
use serde::{Deserialize, Serialize};
use anyhow::{Result, Context};
use log::warn;

use crate::schema::{FieldSpec, Schema};

/// Main configuration structure for task_parser
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// AI provider configurations, tried in declaration order
    #[serde(default)]
    pub ai_providers: AIProvidersConfig,

    /// Extraction behaviour
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Custom schema; overrides `extraction.schema` when it has fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaConfig>,

    /// Output configuration
    #[serde(default)]
    pub ui: UIConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AIProvidersConfig {
    pub openai: Option<ProviderConfig>,
    pub anthropic: Option<ProviderConfig>,
    pub openrouter: Option<ProviderConfig>,
    pub ollama: Option<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether this provider is enabled
    pub enabled: bool,

    /// Model to use
    pub model: String,

    /// Override the endpoint, e.g. for a proxy or a remote Ollama host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Sampling temperature; 0 keeps extraction deterministic
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Seconds to wait for the completion endpoint
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Built-in schema preset ("gtd" or "full")
    #[serde(default = "default_schema")]
    pub schema: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub fields: Vec<SchemaFieldConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaFieldConfig {
    pub name: String,

    /// short_text, text_list, optional_text, date_or_time_expression or enum
    pub kind: String,

    /// Legal values for enum fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Marker stripped from list entries, e.g. "@"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIConfig {
    /// Enable colorful output
    #[serde(default = "default_colorful")]
    pub colorful: bool,

    /// Output format ("terminal" or "json")
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

// Default value functions
fn default_temperature() -> f32 { 0.0 }
fn default_timeout_secs() -> u64 { 30 }
fn default_schema() -> String { "gtd".to_string() }
fn default_colorful() -> bool { true }
fn default_output_format() -> String { "terminal".to_string() }

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            schema: default_schema(),
        }
    }
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            colorful: default_colorful(),
            output_format: default_output_format(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ai_providers: AIProvidersConfig {
                openai: Some(ProviderConfig {
                    enabled: true,
                    model: "gpt-4o".to_string(),
                    base_url: None,
                }),
                anthropic: Some(ProviderConfig {
                    enabled: false,
                    model: "claude-sonnet-4-0".to_string(),
                    base_url: None,
                }),
                openrouter: Some(ProviderConfig {
                    enabled: false,
                    model: "openai/gpt-4o-mini".to_string(),
                    base_url: None,
                }),
                ollama: Some(ProviderConfig {
                    enabled: false,
                    model: "qwen3:8b".to_string(),
                    base_url: Some("http://localhost:11434".to_string()),
                }),
            },
            extraction: ExtractionConfig::default(),
            schema: None,
            ui: UIConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Load configuration from command line argument or default locations
    pub fn load(config_path: &Option<String>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::from_file(shellexpand::tilde(path).as_ref());
        }

        let default_paths = [
            "task_parser.toml",
            ".task_parser.toml",
            "~/.config/task_parser/config.toml",
        ];

        for path in default_paths {
            let expanded_path = shellexpand::tilde(path);
            if Path::new(expanded_path.as_ref()).exists() {
                match Self::from_file(expanded_path.as_ref()) {
                    Ok(config) => return Ok(config),
                    Err(e) => warn!("Failed to load config from {}: {:#}", path, e),
                }
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        fs::write(path.as_ref(), contents)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Resolve the schema to extract: custom fields if declared, else the preset.
    pub fn schema(&self) -> Result<Schema> {
        match self.schema.as_ref().filter(|s| !s.fields.is_empty()) {
            Some(custom) => {
                let fields = custom
                    .fields
                    .iter()
                    .map(|f| {
                        FieldSpec::from_parts(
                            &f.name,
                            &f.kind,
                            &f.values,
                            f.description.as_deref(),
                            f.marker.as_deref(),
                        )
                    })
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .context("Invalid [schema] field")?;
                Schema::new(fields).context("Invalid [schema] section")
            }
            None => Schema::preset(&self.extraction.schema)
                .context("Invalid extraction.schema"),
        }
    }

    /// Merge with command-line arguments (CLI args take precedence)
    pub fn merge_with_args(
        &mut self,
        schema: Option<String>,
        temperature: Option<f32>,
        timeout_secs: Option<u64>,
        json: bool,
    ) {
        if let Some(schema) = schema {
            self.extraction.schema = schema;
            self.schema = None;
        }
        if let Some(temperature) = temperature {
            self.extraction.temperature = temperature;
        }
        if let Some(timeout_secs) = timeout_secs {
            self.extraction.timeout_secs = timeout_secs;
        }
        if json {
            self.ui.output_format = "json".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::from_toml(
            r#"
            [ai_providers.ollama]
            enabled = true
            model = "llama3.2"

            [extraction]
            temperature = 0.3
            "#,
        )
        .unwrap();

        assert_eq!(config.extraction.temperature, 0.3);
        assert_eq!(config.extraction.timeout_secs, 30);
        assert_eq!(config.extraction.schema, "gtd");
        assert!(config.ai_providers.openai.is_none());
        let ollama = config.ai_providers.ollama.unwrap();
        assert_eq!(ollama.model, "llama3.2");
        assert_eq!(ollama.base_url, None);
        assert_eq!(config.ui.output_format, "terminal");
    }

    #[test]
    fn test_custom_schema_section() {
        let config = Config::from_toml(
            r#"
            [[schema.fields]]
            name = "title"
            kind = "short_text"

            [[schema.fields]]
            name = "priority"
            kind = "enum"
            values = ["Low", "Medium", "High"]
            "#,
        )
        .unwrap();

        let schema = config.schema().unwrap();
        assert_eq!(schema.fields().len(), 2);
        assert_eq!(
            schema.field("priority").unwrap().kind,
            FieldKind::Enum(vec!["Low".into(), "Medium".into(), "High".into()])
        );
    }

    #[test]
    fn test_invalid_custom_schema() {
        let config = Config::from_toml(
            r#"
            [[schema.fields]]
            name = "status"
            kind = "enum"
            "#,
        )
        .unwrap();
        assert!(config.schema().is_err());
    }

    #[test]
    fn test_cli_schema_overrides_file_schema() {
        let mut config = Config::from_toml(
            r#"
            [[schema.fields]]
            name = "title"
            kind = "short_text"
            "#,
        )
        .unwrap();
        config.merge_with_args(Some("full".into()), Some(0.7), Some(5), true);

        assert_eq!(config.schema().unwrap(), Schema::full());
        assert_eq!(config.extraction.temperature, 0.7);
        assert_eq!(config.extraction.timeout_secs, 5);
        assert_eq!(config.ui.output_format, "json");
    }

    #[test]
    fn test_save_and_reload() {
        let path = std::env::temp_dir().join(format!(
            "task_parser-config-{}.toml",
            std::process::id()
        ));
        Config::default().save(&path).unwrap();
        let loaded = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(loaded.ai_providers.openai.unwrap().enabled);
        assert_eq!(loaded.extraction.schema, "gtd");
    }
}
