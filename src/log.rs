//! Run Log - Leveled Diagnostics in Encounter Order
//!
//! Every stage appends here instead of writing to a global history.
//! Entries are mirrored to `tracing`; silent entries only at trace level.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Todo,
    Warning,
    Error,
}

impl LogLevel {
    pub fn marker(&self) -> &'static str {
        match self {
            LogLevel::Debug => "[D]",
            LogLevel::Info => "[i]",
            LogLevel::Todo => "[TODO]",
            LogLevel::Warning => "[W]",
            LogLevel::Error => "[E]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub message: String,
    #[serde(default)]
    pub silent: bool,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} {}: {}", self.level.marker(), path, self.message),
            None => write!(f, "{} {}", self.level.marker(), self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: LogEntry) {
        emit(&entry);
        self.entries.push(entry);
    }

    pub fn log(&mut self, level: LogLevel, path: Option<&str>, message: impl Into<String>) {
        self.push(LogEntry {
            level,
            path: path.map(str::to_string),
            message: message.into(),
            silent: false,
        });
    }

    /// Kept in history and statistics, hidden from normal output.
    pub fn log_silent(&mut self, level: LogLevel, path: Option<&str>, message: impl Into<String>) {
        self.push(LogEntry {
            level,
            path: path.map(str::to_string),
            message: message.into(),
            silent: true,
        });
    }

    pub fn warn(&mut self, path: Option<&str>, message: impl Into<String>) {
        self.log(LogLevel::Warning, path, message);
    }

    pub fn error(&mut self, path: Option<&str>, message: impl Into<String>) {
        self.log(LogLevel::Error, path, message);
    }

    pub fn info(&mut self, path: Option<&str>, message: impl Into<String>) {
        self.log(LogLevel::Info, path, message);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count(&self, level: LogLevel) -> usize {
        self.entries.iter().filter(|e| e.level == level).count()
    }

    /// Rendered lines, one per entry, each carrying its level marker.
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(ToString::to_string).collect()
    }
}

fn emit(entry: &LogEntry) {
    let path = entry.path.as_deref().unwrap_or("-");
    if entry.silent {
        tracing::trace!(severity = ?entry.level, path, "{}", entry.message);
        return;
    }
    match entry.level {
        LogLevel::Debug => tracing::debug!(path, "{}", entry.message),
        LogLevel::Info => tracing::info!(path, "{}", entry.message),
        LogLevel::Todo => tracing::info!(path, todo = true, "{}", entry.message),
        LogLevel::Warning => tracing::warn!(path, "{}", entry.message),
        LogLevel::Error => tracing::error!(path, "{}", entry.message),
    }
}
