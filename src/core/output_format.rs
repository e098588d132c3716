//! Record formatters
//!
//! Provides the two record encodings a backend can be configured with:
//! - Json: one JSON object per line, for collectors
//! - Text: logfmt-style `key=value` pairs, for humans

use super::fields::FieldValue;
use super::log_entry::LogEntry;
use serde::{Deserialize, Serialize};

const TIME_KEY: &str = "time";
const LEVEL_KEY: &str = "level";
const MESSAGE_KEY: &str = "msg";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Output format for log entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON format for machine processing
    ///
    /// Example: `{"time":"2025-01-08T10:30:45.000Z","level":"info","msg":"Request processed"}`
    #[default]
    Json,

    /// Logfmt-style text
    ///
    /// Example: `time="2025-01-08T10:30:45.000Z" level=info msg="Request processed"`
    Text,
}

/// Renders [`LogEntry`] values into newline-terminated lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Formatter {
    format: OutputFormat,
    html_escape: bool,
    colors: bool,
}

impl Formatter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            html_escape: false,
            colors: false,
        }
    }

    /// Escape `<`, `>` and `&` in JSON output.
    #[must_use]
    pub fn with_html_escape(mut self, enabled: bool) -> Self {
        self.html_escape = enabled;
        self
    }

    /// Colour the level token in text output.
    #[must_use]
    pub fn with_colors(mut self, enabled: bool) -> Self {
        self.colors = enabled;
        self
    }

    pub fn output_format(&self) -> OutputFormat {
        self.format
    }

    /// Format a log entry, including the trailing newline.
    pub fn format(&self, entry: &LogEntry) -> String {
        let mut line = match self.format {
            OutputFormat::Json => self.format_json(entry),
            OutputFormat::Text => self.format_text(entry),
        };
        line.push('\n');
        line
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        let mut json_obj = serde_json::Map::new();

        for (key, value) in &entry.fields {
            json_obj.insert(resolve_key_clash(key), value.to_json_value());
        }

        json_obj.insert(
            TIME_KEY.to_string(),
            serde_json::Value::String(entry.timestamp.format(TIMESTAMP_FORMAT).to_string()),
        );
        json_obj.insert(
            LEVEL_KEY.to_string(),
            serde_json::Value::String(entry.level.token().to_string()),
        );
        json_obj.insert(
            MESSAGE_KEY.to_string(),
            serde_json::Value::String(entry.message.clone()),
        );

        let line = serde_json::Value::Object(json_obj).to_string();
        if self.html_escape {
            escape_html(&line)
        } else {
            line
        }
    }

    fn format_text(&self, entry: &LogEntry) -> String {
        let mut parts = Vec::with_capacity(entry.fields.len() + 3);

        parts.push(format!(
            "{}={}",
            TIME_KEY,
            quote_value(&entry.timestamp.format(TIMESTAMP_FORMAT).to_string())
        ));
        parts.push(format!("{}={}", LEVEL_KEY, self.level_token(entry)));
        parts.push(format!("{}={}", MESSAGE_KEY, quote_value(&entry.message)));

        for (key, value) in &entry.fields {
            let formatted_value = match value {
                FieldValue::String(s) => escape_value(s),
                FieldValue::Error(e) => escape_value(&e.message),
                other => other.to_string(),
            };
            parts.push(format!(
                "{}={}",
                escape_key(&resolve_key_clash(key)),
                formatted_value
            ));
        }

        parts.join(" ")
    }

    #[cfg(feature = "console")]
    fn level_token(&self, entry: &LogEntry) -> String {
        use colored::Colorize;
        if self.colors {
            entry
                .level
                .token()
                .color(entry.level.color_code())
                .to_string()
        } else {
            entry.level.token().to_string()
        }
    }

    #[cfg(not(feature = "console"))]
    fn level_token(&self, entry: &LogEntry) -> String {
        entry.level.token().to_string()
    }
}

/// User fields never overwrite the reserved record keys.
fn resolve_key_clash(key: &str) -> String {
    match key {
        TIME_KEY | LEVEL_KEY | MESSAGE_KEY => format!("fields.{}", key),
        _ => key.to_string(),
    }
}

fn escape_html(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a logfmt key (remove spaces and special chars)
fn escape_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect()
}

/// Escape a logfmt value (quote if it needs it)
fn escape_value(value: &str) -> String {
    if value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '=' | '\\'))
    {
        quote_value(value)
    } else {
        value.to_string()
    }
}

fn quote_value(value: &str) -> String {
    format!(
        "\"{}\"",
        value
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    )
}
