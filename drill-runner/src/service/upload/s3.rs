use aws_sdk_s3 as s3;
use drill_core::domain::target::TargetConfig;
use s3::config::Region;
use s3::error::DisplayErrorContext;
use s3::primitives::ByteStream;
use std::path::Path;
use tracing::info;

use super::{UploadError, join_remote_path};

const DEFAULT_ENDPOINT: &str = "s3.amazonaws.com";
const DEFAULT_REGION: &str = "us-east-1";

/// PutObject against an S3-compatible endpoint with static credentials
pub(super) async fn upload(
    config: &TargetConfig,
    local: &Path,
    remote_name: &str,
) -> Result<(), UploadError> {
    let bucket = config
        .get_str("bucket")
        .ok_or(UploadError::MissingConfig("bucket"))?;
    let access_key = config
        .get_str("access_key")
        .ok_or(UploadError::MissingConfig("access_key"))?;
    let secret_key = config
        .get_str("secret_key")
        .ok_or(UploadError::MissingConfig("secret_key"))?;

    let endpoint = endpoint_url(config.get_str("endpoint").unwrap_or(DEFAULT_ENDPOINT));
    let region = config.get_str("region").unwrap_or(DEFAULT_REGION);
    let prefix = config.get_str("prefix").unwrap_or("").trim_start_matches('/');
    let key = join_remote_path(prefix, remote_name);

    let sdk_config = aws_config::defaults(s3::config::BehaviorVersion::latest())
        .endpoint_url(&endpoint)
        .region(Region::new(region.to_string()))
        .credentials_provider(s3::config::Credentials::new(
            access_key, secret_key, None, None, "Static",
        ))
        .load()
        .await;

    let s3_config = s3::config::Builder::from(&sdk_config)
        .force_path_style(!config.get_bool("virtual_host"))
        .build();
    let client = s3::Client::from_conf(s3_config);

    let body = ByteStream::from_path(local).await.map_err(|e| {
        UploadError::S3(format!("failed to read {}: {}", local.display(), e))
    })?;

    client
        .put_object()
        .bucket(bucket)
        .key(&key)
        .body(body)
        .send()
        .await
        .map_err(|e| UploadError::S3(DisplayErrorContext(e).to_string()))?;

    info!("Uploaded {} to s3://{}/{}", local.display(), bucket, key);
    Ok(())
}

fn endpoint_url(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", endpoint.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_adds_scheme() {
        assert_eq!(endpoint_url("s3.amazonaws.com"), "https://s3.amazonaws.com");
        assert_eq!(endpoint_url("http://minio:9000/"), "http://minio:9000");
        assert_eq!(
            endpoint_url("https://fra1.digitaloceanspaces.com"),
            "https://fra1.digitaloceanspaces.com"
        );
    }
}
