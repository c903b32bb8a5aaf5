//! Test definition DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to register a new test definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDefinition {
    pub name: String,
    pub workspace_id: String,
    pub source_database_id: String,
    pub source_database_name: String,
    #[serde(default)]
    pub pre_restore_script: Option<String>,
    #[serde(default)]
    pub post_restore_script: Option<String>,
    #[serde(default)]
    pub storage_ids: Vec<Uuid>,
    #[serde(default)]
    pub notification_ids: Vec<Uuid>,
}
