//! Storage and notification target DTOs

use serde::{Deserialize, Serialize};

use crate::domain::target::{NotificationKind, StorageKind, TargetConfig};

/// Request to register a storage target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStorageTarget {
    pub name: String,
    pub kind: StorageKind,
    #[serde(default)]
    pub config: TargetConfig,
}

/// Request to register a notification target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotificationTarget {
    pub name: String,
    pub kind: NotificationKind,
    #[serde(default)]
    pub config: TargetConfig,
}

/// Result of a storage connection test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
}
