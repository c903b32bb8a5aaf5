//! Log domain types

use serde::{Deserialize, Serialize};

/// A line of a job's textual log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now(),
            level,
            message: message.into(),
        }
    }

    /// Render as `[HH:MM:SS] message`, prefixing warnings and errors
    pub fn render(&self) -> String {
        let prefix = match self.level {
            LogLevel::Warning => "WARN: ",
            LogLevel::Error => "ERROR: ",
            LogLevel::Debug | LogLevel::Info => "",
        };
        format!(
            "[{}] {}{}",
            self.timestamp.format("%H:%M:%S"),
            prefix,
            self.message
        )
    }
}
