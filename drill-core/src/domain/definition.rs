//! Test definition domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What to restore, how to validate it and where to send the results
///
/// Read once per job and treated as an immutable snapshot for that job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestDefinition {
    pub id: Uuid,
    pub name: String,
    pub workspace_id: String,
    pub source_database_id: String,
    pub source_database_name: String,
    pub pre_restore_script: Option<String>,
    pub post_restore_script: Option<String>,
    /// Upload order follows this list
    pub storage_ids: Vec<Uuid>,
    pub notification_ids: Vec<Uuid>,
    pub last_processed_backup_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
