//! Per-job textual log
//!
//! Every pipeline stage appends `[HH:MM:SS] message` lines here. The rendered
//! buffer becomes the job's `log_output`; each line is mirrored to `tracing`.

use drill_core::domain::log::{LogEntry, LogLevel};
use std::sync::{Mutex, PoisonError};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Log buffer of one job execution
pub struct JobLog {
    job_id: Uuid,
    entries: Mutex<Vec<LogEntry>>,
}

impl JobLog {
    pub fn new(job_id: Uuid) -> Self {
        Self {
            job_id,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Adds a log entry to the buffer
    pub fn add(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        let entry = LogEntry::new(LogLevel::Info, message);
        info!(job_id = %self.job_id, "{}", entry.message);
        self.add(entry);
    }

    pub fn warn(&self, message: impl Into<String>) {
        let entry = LogEntry::new(LogLevel::Warning, message);
        warn!(job_id = %self.job_id, "{}", entry.message);
        self.add(entry);
    }

    pub fn error(&self, message: impl Into<String>) {
        let entry = LogEntry::new(LogLevel::Error, message);
        error!(job_id = %self.job_id, "{}", entry.message);
        self.add(entry);
    }

    /// Number of buffered lines
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The buffer as persisted text, one line per entry
    pub fn render(&self) -> String {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = String::new();
        for entry in entries.iter() {
            out.push_str(&entry.render());
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_keeps_order_and_prefixes() {
        let log = JobLog::new(Uuid::new_v4());
        log.info("Starting job execution...");
        log.warn("Failed to get version, defaulting to 15");
        log.error("Timed out waiting for sandbox database");

        let text = log.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("] Starting job execution..."));
        assert!(lines[1].contains("WARN: Failed to get version"));
        assert!(lines[2].contains("ERROR: Timed out waiting for sandbox database"));
        assert!(lines.iter().all(|l| l.starts_with('[') && l.as_bytes()[9] == b']'));
    }

    #[test]
    fn test_empty_log() {
        let log = JobLog::new(Uuid::new_v4());
        assert!(log.is_empty());
        assert_eq!(log.render(), "");
        log.info("x");
        assert_eq!(log.len(), 1);
    }
}
