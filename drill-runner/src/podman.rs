//! Container runtime CLI
//!
//! Drives `podman` (or a CLI-compatible runtime such as `docker`) through
//! `tokio::process`. Every invocation logs its stdout/stderr at debug level.

use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info};

use crate::service::sandbox::SandboxError;

/// A container to create
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub env: Vec<(String, String)>,
    /// Host port published to the container port
    pub host_port: u16,
    pub container_port: u16,
}

/// Thin wrapper over the runtime binary
#[derive(Debug, Clone)]
pub struct ContainerRuntime {
    binary: String,
}

impl ContainerRuntime {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Checks that the runtime is installed and answers
    pub async fn check_available(&self) -> Result<String, SandboxError> {
        let output = self.run(&["--version"]).await?;
        if !output.status.success() {
            return Err(SandboxError::RuntimeUnavailable(format!(
                "'{} --version' exited with {}",
                self.binary,
                exit_code(&output)
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        info!("Container runtime is available: {}", version);
        Ok(version)
    }

    /// Whether the image is present locally
    pub async fn image_exists(&self, image: &str) -> Result<bool, SandboxError> {
        let output = self.run(&["image", "inspect", image]).await?;
        Ok(output.status.success())
    }

    pub async fn pull(&self, image: &str) -> Result<(), SandboxError> {
        info!("Pulling image {}", image);
        let output = self.run(&["pull", image]).await?;
        if !output.status.success() {
            return Err(SandboxError::ImagePull {
                image: image.to_string(),
                message: stderr(&output),
            });
        }
        Ok(())
    }

    /// Creates the container and returns its id
    pub async fn create(&self, spec: &ContainerSpec) -> Result<String, SandboxError> {
        let mut args: Vec<String> = vec!["create".into(), "--name".into(), spec.name.clone()];
        for (key, value) in &spec.env {
            args.push("-e".into());
            args.push(format!("{}={}", key, value));
        }
        args.push("-p".into());
        args.push(format!("{}:{}", spec.host_port, spec.container_port));
        args.push(spec.image.clone());

        let output = self.run(args.as_slice()).await?;
        if !output.status.success() {
            return Err(command_error("create", &output));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub async fn start(&self, container: &str) -> Result<(), SandboxError> {
        let output = self.run(&["start", container]).await?;
        if !output.status.success() {
            return Err(command_error("start", &output));
        }
        Ok(())
    }

    /// Stops the container, killing it after `grace_secs`
    pub async fn stop(&self, container: &str, grace_secs: u64) -> Result<(), SandboxError> {
        let grace = grace_secs.to_string();
        let output = self.run(&["stop", "-t", grace.as_str(), container]).await?;
        if !output.status.success() {
            return Err(command_error("stop", &output));
        }
        Ok(())
    }

    pub async fn remove(&self, container: &str) -> Result<(), SandboxError> {
        let output = self.run(&["rm", "-f", container]).await?;
        if !output.status.success() {
            return Err(command_error("rm", &output));
        }
        Ok(())
    }

    async fn run<S: AsRef<str>>(&self, args: &[S]) -> Result<Output, SandboxError> {
        let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        debug!("Running: {} {}", self.binary, args.join(" "));

        let output = Command::new(&self.binary)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                SandboxError::RuntimeUnavailable(format!("failed to execute {}: {}", self.binary, e))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        // Always log stdout/stderr as debug
        if !stdout.trim().is_empty() {
            debug!("{} {} stdout: {}", self.binary, args[0], stdout.trim());
        }
        if !stderr.trim().is_empty() {
            debug!("{} {} stderr: {}", self.binary, args[0], stderr.trim());
        }

        Ok(output)
    }
}

fn exit_code(output: &Output) -> i32 {
    output.status.code().unwrap_or(-1)
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

fn command_error(action: &'static str, output: &Output) -> SandboxError {
    SandboxError::Command {
        action,
        exit_code: exit_code(output),
        message: stderr(output),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_runtime_unavailable() {
        let runtime = ContainerRuntime::new("drill-no-such-runtime-binary");
        let err = runtime.check_available().await.unwrap_err();
        assert!(matches!(err, SandboxError::RuntimeUnavailable(_)));

        let err = runtime.image_exists("postgres:15-alpine").await.unwrap_err();
        assert!(matches!(err, SandboxError::RuntimeUnavailable(_)));
    }
}
