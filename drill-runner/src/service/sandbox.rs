//! Sandbox manager
//!
//! Provisions a throwaway Postgres container per job and tears it down again.
//! Each sandbox owns its container, host port and credentials.

use async_trait::async_trait;
use rand::Rng;
use std::net::TcpListener;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::podman::{ContainerRuntime, ContainerSpec};

const POSTGRES_PORT: u16 = 5432;
const STOP_GRACE_SECS: u64 = 1;
const TOKEN_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("failed to pull image {image}: {message}")]
    ImagePull { image: String, message: String },

    #[error("failed to allocate a host port: {0}")]
    PortAllocation(#[from] std::io::Error),

    #[error("container {action} failed (exit code {exit_code}): {message}")]
    Command {
        action: &'static str,
        exit_code: i32,
        message: String,
    },
}

/// A running sandbox database
#[derive(Debug, Clone)]
pub struct Sandbox {
    pub container_id: String,
    pub container_name: String,
    /// Host the runner connects to
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub version: String,
}

#[async_trait]
pub trait SandboxManager: Send + Sync {
    /// Creates and starts a sandbox for `job_id`
    ///
    /// An empty `version_hint` falls back to the configured default version.
    async fn provision(&self, job_id: Uuid, version_hint: &str) -> Result<Sandbox, SandboxError>;

    /// Stops and removes the sandbox container
    async fn teardown(&self, sandbox: &Sandbox) -> Result<(), SandboxError>;

    /// Removes whatever `provision` left behind for `job_id` when it was
    /// interrupted before returning a sandbox
    async fn discard(&self, job_id: Uuid) -> Result<(), SandboxError>;
}

/// Settings of the container-backed sandbox manager
#[derive(Debug, Clone)]
pub struct SandboxSettings {
    /// Image repository, tagged `<version>-alpine`
    pub image_repository: String,
    pub default_version: String,
    pub connect_host: String,
}

/// Sandboxes as containers driven through the runtime CLI
pub struct ContainerSandboxManager {
    runtime: ContainerRuntime,
    settings: SandboxSettings,
}

impl ContainerSandboxManager {
    pub fn new(runtime: ContainerRuntime, settings: SandboxSettings) -> Self {
        Self { runtime, settings }
    }

    fn image_for(&self, version: &str) -> String {
        format!("{}:{}-alpine", self.settings.image_repository, version)
    }

    async fn ensure_image(&self, image: &str) -> Result<(), SandboxError> {
        if self.runtime.image_exists(image).await? {
            debug!("Image {} already present", image);
            return Ok(());
        }
        self.runtime.pull(image).await
    }
}

#[async_trait]
impl SandboxManager for ContainerSandboxManager {
    async fn provision(&self, job_id: Uuid, version_hint: &str) -> Result<Sandbox, SandboxError> {
        let version = if version_hint.trim().is_empty() {
            self.settings.default_version.clone()
        } else {
            version_hint.trim().to_string()
        };

        let user = format!("user_{}", random_token(5));
        let password = format!("pass_{}", random_token(8));
        let database = sandbox_database_name(job_id);
        let port = free_port()?;

        let image = self.image_for(&version);
        self.ensure_image(&image).await?;

        let spec = ContainerSpec {
            name: container_name(job_id),
            image,
            env: vec![
                ("POSTGRES_USER".to_string(), user.clone()),
                ("POSTGRES_PASSWORD".to_string(), password.clone()),
                ("POSTGRES_DB".to_string(), database.clone()),
            ],
            host_port: port,
            container_port: POSTGRES_PORT,
        };

        let container_id = self.runtime.create(&spec).await?;
        if let Err(e) = self.runtime.start(&container_id).await {
            // A created but never started container would otherwise leak
            let _ = self.runtime.remove(&container_id).await;
            return Err(e);
        }

        info!(
            "Sandbox {} started on port {} (postgres {})",
            spec.name, port, version
        );

        Ok(Sandbox {
            container_id,
            container_name: spec.name,
            host: self.settings.connect_host.clone(),
            port,
            user,
            password,
            database,
            version,
        })
    }

    async fn teardown(&self, sandbox: &Sandbox) -> Result<(), SandboxError> {
        let stopped = self
            .runtime
            .stop(&sandbox.container_id, STOP_GRACE_SECS)
            .await;
        if let Err(e) = &stopped {
            warn!("Failed to stop sandbox {}: {}", sandbox.container_name, e);
        }
        // rm -f also handles a container that is already stopped or stuck
        self.runtime.remove(&sandbox.container_id).await?;
        info!("Sandbox {} removed", sandbox.container_name);
        stopped
    }

    async fn discard(&self, job_id: Uuid) -> Result<(), SandboxError> {
        let name = container_name(job_id);
        self.runtime.remove(&name).await?;
        info!("Sandbox {} discarded", name);
        Ok(())
    }
}

pub fn container_name(job_id: Uuid) -> String {
    format!("drill_job_{}", job_id)
}

/// `db_` followed by the first 8 hex digits of the job id
pub fn sandbox_database_name(job_id: Uuid) -> String {
    let hex = job_id.simple().to_string();
    format!("db_{}", &hex[..8])
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| TOKEN_CHARSET[rng.random_range(0..TOKEN_CHARSET.len())] as char)
        .collect()
}

/// Asks the OS for a free port on the loopback interface
///
/// The listener is dropped before the container binds the port.
fn free_port() -> Result<u16, SandboxError> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name_is_valid_identifier() {
        for _ in 0..64 {
            let name = sandbox_database_name(Uuid::new_v4());
            assert_eq!(name.len(), 11);
            assert!(name.starts_with("db_"));
            assert!(
                name.chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            );
        }

        let fixed = Uuid::parse_str("ABCDEF01-2345-6789-abcd-ef0123456789").unwrap();
        assert_eq!(sandbox_database_name(fixed), "db_abcdef01");
    }

    #[test]
    fn test_random_token() {
        let token = random_token(8);
        assert_eq!(token.len(), 8);
        assert!(token.bytes().all(|b| TOKEN_CHARSET.contains(&b)));
    }

    #[test]
    fn test_free_port_is_bindable() {
        let port = free_port().unwrap();
        assert!(port > 0);
        assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
    }

    /// Runtime stand-in that logs each subcommand and fails `stop`
    #[cfg(unix)]
    fn failing_stop_runtime(dir: &std::path::Path) -> (ContainerRuntime, std::path::PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let log = dir.join("calls.log");
        let script = dir.join("runtime.sh");
        std::fs::write(
            &script,
            format!(
                "#!/bin/sh\necho \"$1\" >> {}\n[ \"$1\" = stop ] && exit 125\nexit 0\n",
                log.display()
            ),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        (ContainerRuntime::new(script.to_string_lossy()), log)
    }

    #[cfg(unix)]
    fn manager(runtime: ContainerRuntime) -> ContainerSandboxManager {
        ContainerSandboxManager::new(
            runtime,
            SandboxSettings {
                image_repository: "docker.io/library/postgres".into(),
                default_version: "16".into(),
                connect_host: "127.0.0.1".into(),
            },
        )
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_teardown_removes_container_when_stop_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, log) = failing_stop_runtime(dir.path());
        let sandbox = Sandbox {
            container_id: "abc123".into(),
            container_name: container_name(Uuid::nil()),
            host: "127.0.0.1".into(),
            port: 5432,
            user: "u".into(),
            password: "p".into(),
            database: "db".into(),
            version: "16".into(),
        };

        let result = manager(runtime).teardown(&sandbox).await;

        assert!(result.is_err());
        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(calls.lines().collect::<Vec<_>>(), vec!["stop", "rm"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_discard_removes_by_container_name() {
        let dir = tempfile::tempdir().unwrap();
        let (runtime, log) = failing_stop_runtime(dir.path());

        manager(runtime).discard(Uuid::nil()).await.unwrap();

        let calls = std::fs::read_to_string(&log).unwrap();
        assert_eq!(calls.lines().collect::<Vec<_>>(), vec!["rm"]);
    }

    #[test]
    fn test_container_name() {
        let id = Uuid::nil();
        assert_eq!(
            container_name(id),
            "drill_job_00000000-0000-0000-0000-000000000000"
        );
    }
}
