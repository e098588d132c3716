//! Log entry structure

use super::fields::Fields;
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};

/// A fully resolved record, ready for a formatter.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub fields: Fields,
}

impl LogEntry {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        if !message.contains(['\n', '\r', '\t']) {
            return message.to_string();
        }
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(level: LogLevel, message: &str, fields: Fields) -> Self {
        Self {
            level,
            message: Self::sanitize_message(message),
            timestamp: Utc::now(),
            fields,
        }
    }
}
