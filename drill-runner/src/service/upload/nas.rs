use drill_core::domain::target::TargetConfig;
use std::path::Path;
use tracing::info;

use super::UploadError;

/// Copies the artifact into a mounted directory
pub(super) async fn upload(
    config: &TargetConfig,
    local: &Path,
    remote_name: &str,
) -> Result<(), UploadError> {
    let dir = config
        .get_str("path")
        .ok_or(UploadError::MissingConfig("path"))?;
    let dir = Path::new(dir);

    tokio::fs::create_dir_all(dir).await?;
    let dest = dir.join(remote_name);
    let bytes = tokio::fs::copy(local, &dest).await?;

    info!("Copied {} bytes to {}", bytes, dest.display());
    Ok(())
}
