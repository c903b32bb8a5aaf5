use drill_core::domain::target::TargetConfig;
use std::path::{Path, PathBuf};
use suppaftp::FtpStream;
use suppaftp::types::FileType;
use tracing::info;

use super::{CONNECT_TIMEOUT, UploadError, resolve};

const DEFAULT_PORT: u16 = 21;

/// Binary STOR into `path`, creating missing directories on the way
pub(super) async fn upload(
    config: &TargetConfig,
    local: &Path,
    remote_name: &str,
) -> Result<(), UploadError> {
    let host = config
        .get_str("host")
        .ok_or(UploadError::MissingConfig("host"))?
        .to_string();
    let port = config.get_port("port", DEFAULT_PORT);
    let user = config.get_str("user").unwrap_or("anonymous").to_string();
    let password = config.get_str("password").unwrap_or("").to_string();
    let dir = config.get_str("path").unwrap_or("").replace('\\', "/");
    let local: PathBuf = local.to_path_buf();
    let remote_name = remote_name.to_string();

    tokio::task::spawn_blocking(move || -> Result<(), UploadError> {
        let addr = resolve(&host, port)?;
        let mut ftp = FtpStream::connect_timeout(addr, CONNECT_TIMEOUT)?;
        ftp.login(&user, &password)?;
        ftp.transfer_type(FileType::Binary)?;

        if dir.starts_with('/') {
            ftp.cwd("/")?;
        }
        for segment in dir.split('/').filter(|s| !s.is_empty()) {
            if ftp.cwd(segment).is_err() {
                ftp.mkdir(segment)?;
                ftp.cwd(segment)?;
            }
        }

        let mut file = std::fs::File::open(&local)?;
        let bytes = ftp.put_file(&remote_name, &mut file)?;
        ftp.quit()?;

        info!(
            "Uploaded {} bytes to ftp://{}:{}/{}",
            bytes, host, port, remote_name
        );
        Ok(())
    })
    .await
    .map_err(|e| UploadError::Task(e.to_string()))?
}
