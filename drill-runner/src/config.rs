//! Runner configuration
//!
//! Defines all configurable parameters for the runner: polling, pipeline
//! timings, sandbox settings and the orchestrator/directory connections.

use std::path::PathBuf;
use std::time::Duration;

use crate::scheduler::Scheduler;
use crate::service::{PipelineSettings, PipelineTimings};
use crate::service::sandbox::SandboxSettings;

/// Runner configuration
///
/// All timeouts and intervals are configurable to allow tuning
/// for different deployment scenarios (dev vs prod, fast vs slow networks).
#[derive(Debug, Clone)]
pub struct Config {
    /// Orchestrator base URL (e.g., "http://localhost:8080")
    pub orchestrator_url: String,

    /// Backup directory service base URL and account
    pub directory_url: String,
    pub directory_email: String,
    pub directory_password: String,

    /// Directory holding the backup artifacts written by the directory service
    pub backup_path: PathBuf,

    /// How often to poll the orchestrator for new jobs
    pub poll_interval: Duration,
    pub poll_jitter: Duration,

    /// Max parallel jobs the runner can handle
    pub max_parallel_jobs: usize,

    /// Maximum time a job can run before it is failed
    pub job_timeout: Duration,

    pub readiness_interval: Duration,
    pub readiness_max_retries: u32,

    /// Upper bound of the wait for restored data
    pub restore_settle: Duration,

    /// Engine version used when the directory does not report one
    pub default_pg_version: String,
    pub sandbox_image: String,

    /// Sandbox host as seen by the directory service
    pub sandbox_host: String,
    /// Sandbox host as seen by the runner
    pub sandbox_connect_host: String,

    /// `podman` or a CLI-compatible runtime
    pub container_runtime: String,

    /// Per-transfer upload timeout
    pub upload_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(orchestrator_url: String, directory_url: String) -> Self {
        Self {
            orchestrator_url,
            directory_url,
            directory_email: String::new(),
            directory_password: String::new(),
            backup_path: PathBuf::from("/backups"),
            poll_interval: Duration::from_secs(5),
            poll_jitter: Duration::ZERO,
            max_parallel_jobs: 1,
            job_timeout: Duration::from_secs(3600),
            readiness_interval: Duration::from_secs(2),
            readiness_max_retries: 15,
            restore_settle: Duration::from_secs(30),
            default_pg_version: "15".to_string(),
            sandbox_image: "docker.io/library/postgres".to_string(),
            sandbox_host: "host.docker.internal".to_string(),
            sandbox_connect_host: "127.0.0.1".to_string(),
            container_runtime: "podman".to_string(),
            upload_timeout: Duration::from_secs(300),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - ORCHESTRATOR_URL (required)
    /// - DIRECTORY_URL (required)
    /// - DIRECTORY_EMAIL, DIRECTORY_PASSWORD (optional)
    /// - BACKUP_PATH (optional, default: /backups)
    /// - POLL_INTERVAL (optional, seconds, default: 5)
    /// - POLL_JITTER_MS (optional, default: 0)
    /// - MAX_PARALLEL_JOBS (optional, default: 1)
    /// - JOB_TIMEOUT (optional, seconds, default: 3600)
    /// - READINESS_INTERVAL (optional, seconds, default: 2)
    /// - READINESS_MAX_RETRIES (optional, default: 15)
    /// - RESTORE_SETTLE (optional, seconds, default: 30)
    /// - DEFAULT_PG_VERSION (optional, default: 15)
    /// - SANDBOX_IMAGE (optional, default: docker.io/library/postgres)
    /// - SANDBOX_HOST (optional, default: host.docker.internal)
    /// - SANDBOX_CONNECT_HOST (optional, default: 127.0.0.1)
    /// - CONTAINER_RUNTIME (optional, default: podman)
    /// - UPLOAD_TIMEOUT (optional, seconds, default: 300)
    pub fn from_env() -> anyhow::Result<Self> {
        let orchestrator_url = std::env::var("ORCHESTRATOR_URL")
            .map_err(|_| anyhow::anyhow!("ORCHESTRATOR_URL environment variable not set"))?;

        let directory_url = std::env::var("DIRECTORY_URL")
            .map_err(|_| anyhow::anyhow!("DIRECTORY_URL environment variable not set"))?;

        let mut config = Self::new(orchestrator_url, directory_url);

        config.directory_email = env_or("DIRECTORY_EMAIL", config.directory_email);
        config.directory_password = env_or("DIRECTORY_PASSWORD", config.directory_password);
        config.backup_path = env_or("BACKUP_PATH", config.backup_path);
        config.poll_interval = env_secs("POLL_INTERVAL", config.poll_interval);
        config.poll_jitter = std::env::var("POLL_JITTER_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(config.poll_jitter);
        config.max_parallel_jobs = env_or("MAX_PARALLEL_JOBS", config.max_parallel_jobs);
        config.job_timeout = env_secs("JOB_TIMEOUT", config.job_timeout);
        config.readiness_interval = env_secs("READINESS_INTERVAL", config.readiness_interval);
        config.readiness_max_retries =
            env_or("READINESS_MAX_RETRIES", config.readiness_max_retries);
        config.restore_settle = env_secs("RESTORE_SETTLE", config.restore_settle);
        config.default_pg_version = env_or("DEFAULT_PG_VERSION", config.default_pg_version);
        config.sandbox_image = env_or("SANDBOX_IMAGE", config.sandbox_image);
        config.sandbox_host = env_or("SANDBOX_HOST", config.sandbox_host);
        config.sandbox_connect_host = env_or("SANDBOX_CONNECT_HOST", config.sandbox_connect_host);
        config.container_runtime = env_or("CONTAINER_RUNTIME", config.container_runtime);
        config.upload_timeout = env_secs("UPLOAD_TIMEOUT", config.upload_timeout);

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, url) in [
            ("orchestrator_url", &self.orchestrator_url),
            ("directory_url", &self.directory_url),
        ] {
            if url.is_empty() {
                anyhow::bail!("{} cannot be empty", name);
            }
            if !url.starts_with("http://") && !url.starts_with("https://") {
                anyhow::bail!("{} must start with http:// or https://", name);
            }
        }

        if self.poll_interval.as_secs() == 0 {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.max_parallel_jobs == 0 {
            anyhow::bail!("max_parallel_jobs must be greater than 0");
        }

        if self.job_timeout.as_secs() == 0 {
            anyhow::bail!("job_timeout must be greater than 0");
        }

        if self.readiness_max_retries == 0 {
            anyhow::bail!("readiness_max_retries must be greater than 0");
        }

        if self.default_pg_version.trim().is_empty() {
            anyhow::bail!("default_pg_version cannot be empty");
        }

        if self.container_runtime.trim().is_empty() {
            anyhow::bail!("container_runtime cannot be empty");
        }

        Ok(())
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler {
            interval: self.poll_interval,
            jitter: self.poll_jitter,
            max_parallel_jobs: self.max_parallel_jobs,
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            default_version: self.default_pg_version.clone(),
            restore_host: self.sandbox_host.clone(),
            backup_path: self.backup_path.clone(),
            timings: PipelineTimings {
                readiness_interval: self.readiness_interval,
                readiness_max_retries: self.readiness_max_retries,
                settle_window: self.restore_settle,
                job_timeout: self.job_timeout,
                ..PipelineTimings::default()
            },
        }
    }

    pub fn sandbox_settings(&self) -> SandboxSettings {
        SandboxSettings {
            image_repository: self.sandbox_image.clone(),
            default_version: self.default_pg_version.clone(),
            connect_host: self.sandbox_connect_host.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            "http://localhost:8080".to_string(),
            "http://localhost:4005".to_string(),
        )
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_parallel_jobs, 1);
        assert_eq!(config.job_timeout, Duration::from_secs(3600));
        assert_eq!(config.readiness_max_retries, 15);
        assert_eq!(config.default_pg_version, "15");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        // Valid config should pass
        assert!(config.validate().is_ok());

        // Invalid URL should fail
        config.directory_url = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config.directory_url = "http://localhost:4005".to_string();
        config.max_parallel_jobs = 0;
        assert!(config.validate().is_err());

        config.max_parallel_jobs = 2;
        config.readiness_max_retries = 0;
        assert!(config.validate().is_err());

        config.readiness_max_retries = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_settings_follow_config() {
        let mut config = Config::default();
        config.restore_settle = Duration::from_secs(45);
        config.sandbox_host = "10.0.0.5".to_string();

        let settings = config.pipeline_settings();
        assert_eq!(settings.timings.settle_window, Duration::from_secs(45));
        assert_eq!(settings.restore_host, "10.0.0.5");
        assert_eq!(settings.default_version, "15");
        assert_eq!(config.scheduler().max_parallel_jobs, 1);
    }
}
