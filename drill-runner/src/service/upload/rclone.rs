use drill_core::domain::target::TargetConfig;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info};

use super::{UploadError, join_remote_path};

const DEFAULT_BINARY: &str = "rclone";

/// `rclone copyto <local> <remote_path>/<name>`
///
/// The child is killed when the upload future is dropped, e.g. on timeout.
pub(super) async fn upload(
    config: &TargetConfig,
    local: &Path,
    remote_name: &str,
) -> Result<(), UploadError> {
    let remote = config
        .get_str("remote_path")
        .ok_or(UploadError::MissingConfig("remote_path"))?;
    let dest = destination(remote, remote_name);

    let binary = config.get_str("binary").unwrap_or(DEFAULT_BINARY);
    let mut command = Command::new(binary);
    command.arg("copyto").arg(local).arg(&dest).kill_on_drop(true);
    if let Some(config_path) = config.get_str("config_path") {
        command.arg("--config").arg(config_path);
    }

    debug!("Running {} copyto {} {}", binary, local.display(), dest);
    let output = command.output().await?;
    if !output.status.success() {
        return Err(UploadError::Command {
            program: "rclone",
            exit_code: output.status.code().unwrap_or(-1),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    info!("Uploaded {} to {}", local.display(), dest);
    Ok(())
}

/// A bare remote (`name:`) takes the file at its root
fn destination(remote: &str, remote_name: &str) -> String {
    if remote.ends_with(':') {
        format!("{}{}", remote, remote_name)
    } else {
        join_remote_path(remote, remote_name)
    }
}
