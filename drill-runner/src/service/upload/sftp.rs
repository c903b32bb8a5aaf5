use drill_core::domain::target::TargetConfig;
use ssh2::{Session, Sftp};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::{CONNECT_TIMEOUT, UploadError, join_remote_path, resolve};

const DEFAULT_PORT: u16 = 22;
const SESSION_TIMEOUT_MS: u32 = 30_000;

/// Writes the artifact over SFTP, authenticating with the private key first
/// and the password second
pub(super) async fn upload(
    config: &TargetConfig,
    local: &Path,
    remote_name: &str,
) -> Result<(), UploadError> {
    let host = config
        .get_str("host")
        .ok_or(UploadError::MissingConfig("host"))?
        .to_string();
    let user = config
        .get_str("user")
        .ok_or(UploadError::MissingConfig("user"))?
        .to_string();
    let port = config.get_port("port", DEFAULT_PORT);
    let password = config.get_str("password").map(str::to_string);
    let private_key = config.get_str("private_key").map(str::to_string);
    if password.is_none() && private_key.is_none() {
        return Err(UploadError::MissingConfig("password"));
    }

    let dir = config.get_str("path").unwrap_or("").to_string();
    let remote = join_remote_path(&dir, remote_name);
    let local: PathBuf = local.to_path_buf();

    tokio::task::spawn_blocking(move || -> Result<(), UploadError> {
        let tcp = TcpStream::connect_timeout(&resolve(&host, port)?, CONNECT_TIMEOUT)?;
        let mut session = Session::new()?;
        session.set_tcp_stream(tcp);
        session.set_timeout(SESSION_TIMEOUT_MS);
        session.handshake()?;

        if let Some(key) = &private_key {
            if let Err(e) = session.userauth_pubkey_memory(&user, None, key, None) {
                warn!("SFTP key authentication failed for {}: {}", user, e);
            }
        }
        if !session.authenticated() {
            if let Some(password) = &password {
                session.userauth_password(&user, password)?;
            }
        }
        if !session.authenticated() {
            return Err(UploadError::SftpAuth(user));
        }

        let sftp = session.sftp()?;
        mkdir_all(&sftp, &dir)?;

        let mut source = std::fs::File::open(&local)?;
        let mut dest = sftp.create(Path::new(&remote))?;
        let bytes = std::io::copy(&mut source, &mut dest)?;

        info!("Uploaded {} bytes to sftp://{}:{}{}", bytes, host, port, remote);
        Ok(())
    })
    .await
    .map_err(|e| UploadError::Task(e.to_string()))?
}

/// `mkdir -p` over SFTP
fn mkdir_all(sftp: &Sftp, dir: &str) -> Result<(), UploadError> {
    let normalized = dir.replace('\\', "/");
    let mut current = if normalized.starts_with('/') {
        String::from("/")
    } else {
        String::new()
    };

    for segment in normalized.split('/').filter(|s| !s.is_empty()) {
        if !current.is_empty() && !current.ends_with('/') {
            current.push('/');
        }
        current.push_str(segment);

        let path = Path::new(&current);
        if sftp.stat(path).is_err() {
            sftp.mkdir(path, 0o755)?;
        }
    }

    Ok(())
}
