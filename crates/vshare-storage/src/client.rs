//! S3-compatible storage client.
//!
//! Holds the uploaded video binaries. Works against any S3 API endpoint
//! (MinIO in development, R2/S3 in production).

use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Configuration for the storage client.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// S3 API endpoint URL
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region ("auto" for R2-style endpoints)
    pub region: String,
}

impl StorageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("S3_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("S3_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("S3_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("S3_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("S3_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("S3_BUCKET_NAME")
                .map_err(|_| StorageError::config_error("S3_BUCKET_NAME not set"))?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "auto".to_string()),
        })
    }
}

/// An object (or slice of one) read back from storage.
#[derive(Debug)]
pub struct RangedObject {
    /// The returned bytes (the requested slice, or the whole object).
    pub bytes: Vec<u8>,
    /// Total size of the stored object, regardless of the slice.
    pub total_size: u64,
    /// Stored content type.
    pub content_type: String,
    /// `Content-Range` of the response when a range was served.
    pub content_range: Option<String>,
}

/// S3-compatible storage client.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    bucket: String,
}

impl StorageClient {
    /// Create a new storage client from configuration.
    pub async fn new(config: StorageConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "vshare",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(sdk_config),
            bucket: config.bucket_name,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        Self::new(StorageConfig::from_env()?).await
    }

    /// Storage key for an uploaded video file.
    pub fn video_key(owner_id: &str, video_id: &str, filename: &str) -> String {
        format!("videos/{}/{}/{}", owner_id, video_id, filename)
    }

    /// Upload a video's bytes and return the stable key.
    pub async fn upload_bytes(
        &self,
        data: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        debug!("Uploading {} bytes to {}", data.len(), key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded object {}", key);
        Ok(())
    }

    /// Get an object, optionally restricted to a `Range` header value
    /// (passed through verbatim, e.g. `bytes=0-1023`).
    ///
    /// The reported total size comes from `Content-Range` on partial
    /// responses, so range reads still know the full object length.
    pub async fn get_object_range(
        &self,
        key: &str,
        range: Option<&str>,
    ) -> StorageResult<RangedObject> {
        let mut request = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some(r) = range {
            request = request.range(r);
        }

        let response = request.send().await.map_err(|e| {
            if e.to_string().contains("NoSuchKey") {
                StorageError::not_found(key)
            } else {
                StorageError::DownloadFailed(e.to_string())
            }
        })?;

        let content_length = response.content_length().unwrap_or(0).max(0) as u64;
        let content_type = response
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let content_range = response.content_range().map(str::to_string);

        let total_size = content_range
            .as_deref()
            .and_then(total_from_content_range)
            .unwrap_or(content_length);

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
            .into_bytes()
            .to_vec();

        Ok(RangedObject {
            bytes,
            total_size,
            content_type,
            content_range,
        })
    }

    /// Generate a short-lived presigned GET URL. The sensitivity service
    /// fetches uploads through these instead of getting bucket credentials.
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Delete an object by key.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }
}

/// Parse the total length out of a `Content-Range: bytes start-end/total`
/// header. Returns `None` for unknown (`*`) totals.
fn total_from_content_range(header: &str) -> Option<u64> {
    header.rsplit('/').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_from_content_range() {
        assert_eq!(total_from_content_range("bytes 0-1023/20480"), Some(20480));
        assert_eq!(total_from_content_range("bytes 100-199/200"), Some(200));
        assert_eq!(total_from_content_range("bytes 0-0/*"), None);
    }

    #[test]
    fn test_video_key_layout() {
        assert_eq!(
            StorageClient::video_key("u1", "v1", "clip.mp4"),
            "videos/u1/v1/clip.mp4"
        );
    }
}
