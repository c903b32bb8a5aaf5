//! Storage and notification target domain types
//!
//! Targets carry a free-form JSON `config` keyed by kind. They are looked up
//! by id when a job uploads or notifies, never snapshotted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Where archived backup artifacts are sent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageTarget {
    pub id: Uuid,
    pub name: String,
    pub kind: StorageKind,
    pub config: TargetConfig,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StorageKind {
    S3,
    Ftp,
    Sftp,
    Nas,
    Rclone,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::S3 => "S3",
            StorageKind::Ftp => "FTP",
            StorageKind::Sftp => "SFTP",
            StorageKind::Nas => "NAS",
            StorageKind::Rclone => "RCLONE",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "S3" => Ok(StorageKind::S3),
            "FTP" => Ok(StorageKind::Ftp),
            "SFTP" => Ok(StorageKind::Sftp),
            "NAS" => Ok(StorageKind::Nas),
            "RCLONE" => Ok(StorageKind::Rclone),
            other => Err(format!("unknown storage kind '{}'", other)),
        }
    }
}

/// Where job results are announced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationTarget {
    pub id: Uuid,
    pub name: String,
    pub kind: NotificationKind,
    pub config: TargetConfig,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationKind {
    Telegram,
    Email,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Telegram => "TELEGRAM",
            NotificationKind::Email => "EMAIL",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TELEGRAM" => Ok(NotificationKind::Telegram),
            "EMAIL" => Ok(NotificationKind::Email),
            other => Err(format!("unknown notification kind '{}'", other)),
        }
    }
}

/// Kind-specific settings of a target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetConfig(pub HashMap<String, serde_json::Value>);

impl TargetConfig {
    /// Non-empty string value of `key`
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Identifier stored either as a string or as a number, such as a chat id
    pub fn get_text(&self, key: &str) -> Option<String> {
        match self.0.get(key) {
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            Some(serde_json::Value::String(_)) => self.get_str(key).map(str::to_string),
            _ => None,
        }
    }

    /// Port stored either as a number or as a numeric string
    pub fn get_port(&self, key: &str, default: u16) -> u16 {
        match self.0.get(key) {
            Some(serde_json::Value::Number(n)) => n
                .as_u64()
                .and_then(|p| u16::try_from(p).ok())
                .unwrap_or(default),
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn get_bool(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => matches!(s.as_str(), "true" | "1" | "yes"),
            _ => false,
        }
    }
}

impl From<HashMap<String, serde_json::Value>> for TargetConfig {
    fn from(map: HashMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}
