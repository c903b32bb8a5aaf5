//! Backup directory API client
//!
//! The backup directory is the external service that owns backups and performs
//! restores. Every call signs in first and sends the token as a bearer header.

use std::time::Duration;

use drill_core::domain::backup::Backup;
use drill_core::domain::target::{StorageKind, StorageTarget};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{ClientError, Result, extract_message};
use crate::{handle_empty_response, handle_response};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const RESTORE_TIMEOUT: Duration = Duration::from_secs(30);
const STORAGE_TEST_TIMEOUT: Duration = Duration::from_secs(15);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for the backup directory
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub base_url: String,
    pub email: String,
    pub password: String,
}

/// Endpoint the directory should restore a backup into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryDatabase {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub postgresql: Option<PostgresMeta>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostgresMeta {
    #[serde(default)]
    pub version: String,
}

#[derive(Deserialize)]
struct SignInResponse {
    token: String,
}

#[derive(Deserialize)]
struct WorkspacesResponse {
    workspaces: Vec<Workspace>,
}

#[derive(Deserialize)]
struct BackupsResponse {
    backups: Vec<Backup>,
}

/// HTTP client for the backup directory API
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    config: DirectoryConfig,
    client: Client,
}

impl DirectoryClient {
    pub fn new(config: DirectoryConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    pub fn with_client(mut config: DirectoryConfig, client: Client) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self { config, client }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    async fn sign_in(&self) -> Result<String> {
        let response = self
            .client
            .post(self.url("/api/v1/users/signin"))
            .timeout(DEFAULT_TIMEOUT)
            .json(&json!({
                "email": self.config.email,
                "password": self.config.password,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Unauthorized(
                "failed to sign in to the backup directory: check credentials".to_string(),
            ));
        }

        let body: SignInResponse = handle_response(response).await?;
        Ok(body.token)
    }

    /// Whether the directory answers its health endpoint
    pub async fn health(&self) -> bool {
        match self
            .client
            .get(self.url("/api/v1/system/health"))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!("Backup directory health check failed: {}", e);
                false
            }
        }
    }

    pub async fn list_workspaces(&self) -> Result<Vec<Workspace>> {
        let token = self.sign_in().await?;
        let response = self
            .client
            .get(self.url("/api/v1/workspaces"))
            .bearer_auth(token)
            .timeout(DEFAULT_TIMEOUT)
            .send()
            .await?;

        let body: WorkspacesResponse = handle_response(response).await?;
        Ok(body.workspaces)
    }

    pub async fn list_databases(&self, workspace_id: &str) -> Result<Vec<DirectoryDatabase>> {
        let token = self.sign_in().await?;
        let response = self
            .client
            .get(self.url("/api/v1/databases"))
            .query(&[("workspace_id", workspace_id)])
            .bearer_auth(token)
            .timeout(DEFAULT_TIMEOUT)
            .send()
            .await?;

        handle_response(response).await
    }

    /// Engine major version of a source database
    ///
    /// `None` when the database is not listed or reports no version.
    pub async fn database_version(
        &self,
        workspace_id: &str,
        database_id: &str,
    ) -> Result<Option<String>> {
        let databases = self.list_databases(workspace_id).await?;

        Ok(databases
            .into_iter()
            .find(|db| db.id == database_id)
            .and_then(|db| db.postgresql)
            .map(|meta| meta.version)
            .filter(|version| !version.is_empty()))
    }

    /// Most recent backup of a database, whatever its status
    pub async fn latest_backup(&self, database_id: &str) -> Result<Option<Backup>> {
        let token = self.sign_in().await?;
        let response = self
            .client
            .get(self.url("/api/v1/backups"))
            .query(&[
                ("database_id", database_id),
                ("limit", "1"),
                ("sort", "created_at:desc"),
            ])
            .bearer_auth(token)
            .timeout(DEFAULT_TIMEOUT)
            .send()
            .await?;

        let body: BackupsResponse = handle_response(response).await?;
        Ok(body.backups.into_iter().next())
    }

    /// Ask the directory to restore `backup_id` into `target`
    pub async fn trigger_restore(&self, backup_id: &str, target: &RestoreTarget) -> Result<()> {
        let token = self.sign_in().await?;
        let response = self
            .client
            .post(self.url(&format!("/api/v1/restores/{}/restore", backup_id)))
            .bearer_auth(token)
            .timeout(RESTORE_TIMEOUT)
            .json(&restore_payload(target))
            .send()
            .await?;

        handle_empty_response(response).await
    }

    /// Verify a storage target through the directory's direct-test endpoint
    ///
    /// The first workspace visible to the configured account owns the test.
    pub async fn test_storage_connection(&self, target: &StorageTarget) -> Result<()> {
        let workspaces = self.list_workspaces().await?;
        let workspace = workspaces.first().ok_or_else(|| {
            ClientError::NotFound("no workspace available in the backup directory".to_string())
        })?;

        let token = self.sign_in().await?;
        let response = self
            .client
            .post(self.url("/api/v1/storages/direct-test"))
            .bearer_auth(token)
            .timeout(STORAGE_TEST_TIMEOUT)
            .json(&storage_test_payload(&workspace.id, target))
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::api_error(
                status.as_u16(),
                extract_message(&body),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Payloads
// =============================================================================

fn restore_payload(target: &RestoreTarget) -> Value {
    json!({
        "postgresqlDatabase": {
            "host": target.host,
            "port": target.port,
            "username": target.username,
            "password": target.password,
            "database": target.database,
            "sslmode": "disable",
        }
    })
}

/// Translate a storage target into the directory's storage payload
pub fn storage_test_payload(workspace_id: &str, target: &StorageTarget) -> Value {
    let cfg = &target.config;
    let text = |key: &str| cfg.get_str(key).unwrap_or_default().to_string();

    let mut payload = json!({
        "workspaceId": workspace_id,
        "type": target.kind.as_str(),
        "name": format!("{} (Test)", target.name),
    });

    let (key, body) = match target.kind {
        StorageKind::S3 => (
            "s3Storage",
            json!({
                "s3Bucket": text("bucket"),
                "s3Region": text("region"),
                "s3AccessKey": text("access_key"),
                "s3SecretKey": text("secret_key"),
                "s3Endpoint": text("endpoint"),
                "s3Prefix": text("prefix"),
                "s3UseVirtualHostedStyle": cfg.get_bool("virtual_host"),
            }),
        ),
        StorageKind::Nas => (
            "nasStorage",
            json!({
                "host": text("host"),
                "port": cfg.get_port("port", 445),
                "share": text("share"),
                "path": text("path"),
                "username": text("user"),
                "password": text("password"),
                "domain": text("domain"),
            }),
        ),
        StorageKind::Ftp => (
            "ftpStorage",
            json!({
                "host": text("host"),
                "port": cfg.get_port("port", 21),
                "username": text("user"),
                "password": text("password"),
                "path": text("path"),
            }),
        ),
        StorageKind::Sftp => (
            "sftpStorage",
            json!({
                "host": text("host"),
                "port": cfg.get_port("port", 22),
                "username": text("user"),
                "password": text("password"),
                "privateKey": text("private_key"),
                "path": text("path"),
            }),
        ),
        StorageKind::Rclone => (
            "rcloneStorage",
            json!({
                "configContent": text("config_content"),
                "remotePath": text("remote_path"),
            }),
        ),
    };
    payload[key] = body;

    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use drill_core::domain::target::TargetConfig;
    use uuid::Uuid;

    fn storage(kind: StorageKind, config: Value) -> StorageTarget {
        StorageTarget {
            id: Uuid::new_v4(),
            name: "offsite".into(),
            kind,
            config: serde_json::from_value::<TargetConfig>(config).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = DirectoryClient::new(DirectoryConfig {
            base_url: "http://directory:4005/".into(),
            email: "a@b.c".into(),
            password: "secret".into(),
        });
        assert_eq!(client.base_url(), "http://directory:4005");
        assert_eq!(
            client.url("/api/v1/system/health"),
            "http://directory:4005/api/v1/system/health"
        );
    }

    #[test]
    fn test_restore_payload_shape() {
        let payload = restore_payload(&RestoreTarget {
            host: "host.docker.internal".into(),
            port: 49152,
            username: "user_abcde".into(),
            password: "pass_12345678".into(),
            database: "db_0a1b2c3d".into(),
        });

        let db = &payload["postgresqlDatabase"];
        assert_eq!(db["host"], "host.docker.internal");
        assert_eq!(db["port"], 49152);
        assert_eq!(db["database"], "db_0a1b2c3d");
        assert_eq!(db["sslmode"], "disable");
    }

    #[test]
    fn test_storage_payload_for_s3() {
        let target = storage(
            StorageKind::S3,
            json!({"bucket": "drills", "access_key": "AK", "secret_key": "SK", "virtual_host": true}),
        );
        let payload = storage_test_payload("ws-1", &target);

        assert_eq!(payload["workspaceId"], "ws-1");
        assert_eq!(payload["type"], "S3");
        assert_eq!(payload["name"], "offsite (Test)");
        assert_eq!(payload["s3Storage"]["s3Bucket"], "drills");
        assert_eq!(payload["s3Storage"]["s3Region"], "");
        assert_eq!(payload["s3Storage"]["s3UseVirtualHostedStyle"], true);
    }

    #[test]
    fn test_storage_payload_ports_are_numbers() {
        let target = storage(StorageKind::Ftp, json!({"host": "ftp.local", "port": "2121"}));
        let payload = storage_test_payload("ws-1", &target);
        assert_eq!(payload["ftpStorage"]["port"], 2121);

        let target = storage(StorageKind::Sftp, json!({"host": "sftp.local"}));
        let payload = storage_test_payload("ws-1", &target);
        assert_eq!(payload["sftpStorage"]["port"], 22);
    }

    #[test]
    fn test_database_meta_tolerates_missing_fields() {
        let dbs: Vec<DirectoryDatabase> =
            serde_json::from_str(r#"[{"id":"a"},{"id":"b","postgresql":{"version":"16"}}]"#)
                .unwrap();
        assert!(dbs[0].postgresql.is_none());
        assert_eq!(dbs[1].postgresql.as_ref().unwrap().version, "16");
    }
}
