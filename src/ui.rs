use anyhow::{Context, Result};
use colored::*;

use crate::task::{DateValue, FieldValue, NoteKind, TaskFields};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Self {
        if name.eq_ignore_ascii_case("json") {
            OutputFormat::Json
        } else {
            OutputFormat::Terminal
        }
    }
}

/// Renders extracted fields for a human to review before saving.
pub struct UIHandler {
    pub format: OutputFormat,
}

impl UIHandler {
    pub fn new(format: OutputFormat, colorful: bool) -> Self {
        if !colorful || format == OutputFormat::Json {
            colored::control::set_override(false);
        }
        Self { format }
    }

    pub fn render(&self, fields: &TaskFields) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(fields).context("Failed to serialize task fields")
            }
            OutputFormat::Terminal => Ok(Self::render_terminal(fields)),
        }
    }

    pub fn show(&self, fields: &TaskFields) -> Result<()> {
        println!("{}", self.render(fields)?);
        Ok(())
    }

    fn render_terminal(fields: &TaskFields) -> String {
        let width = fields.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
        let mut out = Vec::new();

        out.push(format!("{}", "=".repeat(60).bright_blue()));
        out.push(format!("{}", "Extracted task".bright_white().bold()));
        out.push(format!("{}", "=".repeat(60).bright_blue()));

        for (name, value) in fields.iter() {
            let marker = if fields.notes_for(name).next().is_some() {
                "!".yellow().bold().to_string()
            } else {
                " ".to_string()
            };
            out.push(format!(
                "{} {}  {}",
                marker,
                format!("{:width$}", name, width = width).cyan(),
                Self::describe(value)
            ));
        }

        if fields.needs_review() {
            out.push(String::new());
            out.push(format!("{}", "Please review:".yellow().bold()));
            for note in fields.notes() {
                let kind = match note.kind {
                    NoteKind::Unresolved => note.kind.to_string().red(),
                    _ => note.kind.to_string().yellow(),
                };
                out.push(format!("  - {} [{}] {}", note.field, kind, note.detail));
            }
        }

        out.join("\n")
    }

    fn describe(value: &FieldValue) -> String {
        match value {
            FieldValue::Null => "-".dimmed().to_string(),
            FieldValue::Text(text) if text.is_empty() => "(empty)".dimmed().to_string(),
            FieldValue::Text(text) => text.clone(),
            FieldValue::List(items) if items.is_empty() => "(none)".dimmed().to_string(),
            FieldValue::List(items) => items.join(", "),
            FieldValue::Date(date @ DateValue::Resolved { has_time, .. }) => format!(
                "{} {}{}",
                date.to_iso_string().unwrap_or_default(),
                format!("({})", date.source()).dimmed(),
                if *has_time { "" } else { " all day" }
            ),
            FieldValue::Date(DateValue::Unresolved { source }) => {
                format!("{} {}", source, "(unresolved)".red())
            }
        }
    }
}
