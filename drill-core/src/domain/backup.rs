//! Backup records reported by the backup directory service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A backup of a source database
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub status: String,
    #[serde(default)]
    pub file_path: Option<String>,
}

impl Backup {
    /// Only finished backups may be restored
    pub fn is_completed(&self) -> bool {
        matches!(self.status.as_str(), "COMPLETED" | "SUCCESS")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_directory_payload() {
        let backup: Backup = serde_json::from_str(
            r#"{"id":"b-1","createdAt":"2025-03-01T10:20:30Z","status":"COMPLETED"}"#,
        )
        .unwrap();

        assert_eq!(backup.id, "b-1");
        assert!(backup.file_path.is_none());
        assert!(backup.is_completed());
    }

    #[test]
    fn test_only_finished_backups_are_eligible() {
        let mut backup = Backup {
            id: "b".into(),
            created_at: Utc::now(),
            status: "SUCCESS".into(),
            file_path: None,
        };
        assert!(backup.is_completed());

        for status in ["FAILED", "IN_PROGRESS", "completed", ""] {
            backup.status = status.into();
            assert!(!backup.is_completed(), "{} should not be eligible", status);
        }
    }
}
