//! Artifact upload fan-out
//!
//! One backend per storage kind. Every transfer runs under the configured
//! per-call timeout and reports a single success or failure; nothing is
//! retried or rolled back.

mod ftp;
mod nas;
mod rclone;
mod s3;
mod sftp;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use drill_core::domain::target::{StorageKind, StorageTarget};
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Bound on opening the control connection of the blocking FTP and SFTP clients
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("missing required config key '{0}'")]
    MissingConfig(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("FTP error: {0}")]
    Ftp(#[from] suppaftp::FtpError),

    #[error("SFTP error: {0}")]
    Sftp(#[from] ssh2::Error),

    #[error("SFTP authentication failed for user {0}")]
    SftpAuth(String),

    #[error("{program} exited with code {exit_code}: {message}")]
    Command {
        program: &'static str,
        exit_code: i32,
        message: String,
    },

    #[error("upload timed out after {0:?}")]
    TimedOut(Duration),

    #[error("upload task failed: {0}")]
    Task(String),
}

#[async_trait]
pub trait ArtifactUploader: Send + Sync {
    /// Sends `local` to `target` under `remote_name`
    async fn upload(
        &self,
        target: &StorageTarget,
        local: &Path,
        remote_name: &str,
    ) -> Result<(), UploadError>;
}

/// Dispatches uploads to the backend matching the target kind
#[derive(Debug, Clone)]
pub struct StorageUploader {
    timeout: Duration,
}

impl StorageUploader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ArtifactUploader for StorageUploader {
    async fn upload(
        &self,
        target: &StorageTarget,
        local: &Path,
        remote_name: &str,
    ) -> Result<(), UploadError> {
        debug!(
            "Uploading {} to {} ({}) as {}",
            local.display(),
            target.name,
            target.kind,
            remote_name
        );

        let config = &target.config;
        let transfer = async {
            match target.kind {
                StorageKind::S3 => s3::upload(config, local, remote_name).await,
                StorageKind::Ftp => ftp::upload(config, local, remote_name).await,
                StorageKind::Sftp => sftp::upload(config, local, remote_name).await,
                StorageKind::Nas => nas::upload(config, local, remote_name).await,
                StorageKind::Rclone => rclone::upload(config, local, remote_name).await,
            }
        };

        tokio::time::timeout(self.timeout, transfer)
            .await
            .map_err(|_| UploadError::TimedOut(self.timeout))?
    }
}

/// Joins a remote directory and a file name with exactly one `/` between them
///
/// Backslashes become slashes and repeated slashes collapse. A leading slash
/// on the prefix is kept.
pub fn join_remote_path(prefix: &str, name: &str) -> String {
    let normalized = prefix.replace('\\', "/");
    let absolute = normalized.starts_with('/');
    let dir = normalized
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    let name = name.trim_start_matches('/');

    match (absolute, dir.is_empty()) {
        (false, true) => name.to_string(),
        (true, true) => format!("/{}", name),
        (false, false) => format!("{}/{}", dir, name),
        (true, false) => format!("/{}/{}", dir, name),
    }
}

/// First address `host:port` resolves to
fn resolve(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    (host, port).to_socket_addrs()?.next().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{}:{} did not resolve to any address", host, port),
        )
    })
}

/// `<database>-<YYYYmmdd_HHMMSS>-backup.dump`
pub fn remote_artifact_name(database_name: &str, created_at: DateTime<Utc>) -> String {
    format!(
        "{}-{}-backup.dump",
        database_name,
        created_at.format("%Y%m%d_%H%M%S")
    )
}

/// First file in `dir` (by name) whose name starts with `backup_id`
pub async fn locate_artifact(dir: &Path, backup_id: &str) -> std::io::Result<Option<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut matches = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(backup_id) {
            matches.push(entry.path());
        }
    }

    matches.sort();
    Ok(matches.into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use drill_core::domain::target::TargetConfig;
    use serde_json::json;
    use uuid::Uuid;

    fn target(kind: StorageKind, config: serde_json::Value) -> StorageTarget {
        StorageTarget {
            id: Uuid::new_v4(),
            name: "archive".into(),
            kind,
            config: serde_json::from_value::<TargetConfig>(config).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_join_remote_path() {
        assert_eq!(join_remote_path("", "a.dump"), "a.dump");
        assert_eq!(join_remote_path("/", "a.dump"), "/a.dump");
        assert_eq!(join_remote_path("backups", "a.dump"), "backups/a.dump");
        assert_eq!(join_remote_path("backups/", "a.dump"), "backups/a.dump");
        assert_eq!(join_remote_path("/srv//backups/", "a.dump"), "/srv/backups/a.dump");
        assert_eq!(join_remote_path("drill\\nightly\\", "a.dump"), "drill/nightly/a.dump");
        assert_eq!(join_remote_path("backups", "/a.dump"), "backups/a.dump");
    }

    #[test]
    fn test_remote_artifact_name() {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 4, 5, 6).unwrap();
        assert_eq!(
            remote_artifact_name("orders", created),
            "orders-20250301_040506-backup.dump"
        );
    }

    #[tokio::test]
    async fn test_locate_artifact_picks_first_match() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b-42.dump.zst"), b"x").unwrap();
        std::fs::write(dir.path().join("b-42.dump"), b"x").unwrap();
        std::fs::write(dir.path().join("b-7.dump"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("b-42-dir")).unwrap();

        let found = locate_artifact(dir.path(), "b-42").await.unwrap();
        assert_eq!(found, Some(dir.path().join("b-42.dump")));

        assert!(locate_artifact(dir.path(), "b-99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_locate_artifact_missing_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(locate_artifact(&missing, "b-1").await.is_err());
    }

    #[tokio::test]
    async fn test_nas_upload_copies_into_nested_dir() {
        let source = tempfile::tempdir().unwrap();
        let mount = tempfile::tempdir().unwrap();
        let local = source.path().join("b-1.dump");
        std::fs::write(&local, b"payload").unwrap();

        let dest = mount.path().join("drill/nightly");
        let target = target(StorageKind::Nas, json!({ "path": dest.to_string_lossy() }));

        StorageUploader::new(Duration::from_secs(5))
            .upload(&target, &local, "orders-backup.dump")
            .await
            .unwrap();

        let copied = std::fs::read(dest.join("orders-backup.dump")).unwrap();
        assert_eq!(copied, b"payload");
    }

    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_refused_connections_fail_without_hitting_the_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("b-1.dump");
        std::fs::write(&local, b"x").unwrap();
        let uploader = StorageUploader::new(Duration::from_secs(20));
        let port = closed_port();

        let ftp = target(StorageKind::Ftp, json!({ "host": "127.0.0.1", "port": port }));
        match uploader.upload(&ftp, &local, "x.dump").await {
            Err(UploadError::Ftp(_)) => {}
            other => panic!("ftp: unexpected result {:?}", other),
        }

        let sftp = target(
            StorageKind::Sftp,
            json!({ "host": "127.0.0.1", "port": port, "user": "u", "password": "p" }),
        );
        match uploader.upload(&sftp, &local, "x.dump").await {
            Err(UploadError::Io(_)) => {}
            other => panic!("sftp: unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_resolve() {
        let addr = resolve("127.0.0.1", 2121).unwrap();
        assert_eq!(addr, SocketAddr::from(([127, 0, 0, 1], 2121)));
    }

    #[tokio::test]
    async fn test_missing_config_is_reported_per_kind() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("b-1.dump");
        std::fs::write(&local, b"x").unwrap();
        let uploader = StorageUploader::new(Duration::from_secs(5));

        let cases = [
            (StorageKind::S3, json!({ "access_key": "a", "secret_key": "s" }), "bucket"),
            (StorageKind::Ftp, json!({ "user": "u" }), "host"),
            (StorageKind::Sftp, json!({ "user": "u" }), "host"),
            (StorageKind::Nas, json!({}), "path"),
            (StorageKind::Rclone, json!({}), "remote_path"),
        ];

        for (kind, config, key) in cases {
            match uploader.upload(&target(kind, config), &local, "x.dump").await {
                Err(UploadError::MissingConfig(missing)) => assert_eq!(missing, key),
                other => panic!("{}: unexpected result {:?}", kind, other),
            }
        }
    }
}
