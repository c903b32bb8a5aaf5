//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// One execution of a test definition
///
/// Persisted by the orchestrator, claimed and finished by a runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    /// Cleared when the definition is deleted
    pub definition_id: Option<Uuid>,
    /// Definition name captured at enqueue time
    pub definition_name: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_seconds: i64,
    pub log_output: String,
    pub last_processed_backup_id: Option<String>,
}

/// Job lifecycle status
///
/// `Pending -> Running -> Success | Failed`, each transition happening once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(JobStatus::Pending),
            "RUNNING" => Ok(JobStatus::Running),
            "SUCCESS" => Ok(JobStatus::Success),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// Terminal state reported by the runner when a job finishes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub status: JobStatus,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub log_output: String,
    pub last_processed_backup_id: Option<String>,
}

impl JobOutcome {
    /// Build an outcome finishing now, measuring the duration from `started_at`
    pub fn finish(
        started_at: Option<DateTime<Utc>>,
        status: JobStatus,
        log_output: String,
        last_processed_backup_id: Option<String>,
    ) -> Self {
        let finished_at = Utc::now();
        let duration_seconds = started_at
            .map(|start| (finished_at - start).num_seconds().max(0))
            .unwrap_or(0);

        Self {
            status,
            finished_at,
            duration_seconds,
            log_output,
            last_processed_backup_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_string_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Success,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
        assert!("DONE".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_status_serializes_uppercase() {
        let json = serde_json::to_string(&JobStatus::Success).unwrap();
        assert_eq!(json, "\"SUCCESS\"");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_outcome_duration_from_start() {
        let started = Utc::now() - Duration::seconds(42);
        let outcome = JobOutcome::finish(Some(started), JobStatus::Success, String::new(), None);
        assert!(outcome.duration_seconds >= 42);
        assert!(outcome.duration_seconds < 60);
    }

    #[test]
    fn test_outcome_without_start_has_zero_duration() {
        let outcome = JobOutcome::finish(None, JobStatus::Failed, "log".into(), None);
        assert_eq!(outcome.duration_seconds, 0);
        assert_eq!(outcome.log_output, "log");
    }
}
