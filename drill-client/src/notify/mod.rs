//! Notification channels
//!
//! Best effort: the runner's pipeline logs a failed send and moves on, and
//! the orchestrator reports the error of a test send back to the caller.
//! Nothing here ever changes a job's status.

mod email;
mod telegram;

use async_trait::async_trait;
use drill_core::domain::job::JobStatus;
use drill_core::domain::target::{NotificationKind, NotificationTarget};
use std::time::Duration;
use thiserror::Error;

const TELEGRAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("missing required config key '{0}'")]
    MissingConfig(&'static str),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("channel rejected the message ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("email delivery failed: {0}")]
    Email(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        target: &NotificationTarget,
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError>;
}

/// Sends through the channel matching the target kind
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    http: reqwest::Client,
    telegram_api: String,
}

impl ChannelNotifier {
    pub fn new() -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder()
            .timeout(TELEGRAM_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            telegram_api: telegram::API_BASE.to_string(),
        })
    }

    /// Points Telegram calls at another base URL
    pub fn with_telegram_api(mut self, base_url: impl Into<String>) -> Self {
        self.telegram_api = base_url.into();
        self
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(
        &self,
        target: &NotificationTarget,
        subject: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        match target.kind {
            NotificationKind::Telegram => {
                telegram::send(&self.http, &self.telegram_api, &target.config, body).await
            }
            NotificationKind::Email => email::send(&target.config, subject, body).await,
        }
    }
}

/// `[STATUS] Restore Test: <name>` followed by a blank line and the message
pub fn compose_message(status: JobStatus, definition_name: &str, message: &str) -> String {
    format!(
        "[{}] Restore Test: {}\n\n{}",
        status, definition_name, message
    )
}

pub fn compose_subject(status: JobStatus) -> String {
    format!("Restore Drill: {}", status)
}

pub const TEST_SUBJECT: &str = "Restore Drill Test";
pub const TEST_MESSAGE: &str = "This is a test notification from Restore Drill.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_message() {
        assert_eq!(
            compose_message(JobStatus::Success, "orders nightly", "Backup b-1 validated successfully."),
            "[SUCCESS] Restore Test: orders nightly\n\nBackup b-1 validated successfully."
        );
        assert_eq!(compose_subject(JobStatus::Failed), "Restore Drill: FAILED");
    }
}
