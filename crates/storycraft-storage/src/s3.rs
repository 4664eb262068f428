//! S3-compatible storage backend.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use storycraft_models::StoredLocation;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};
use crate::MediaStorage;

const DEFAULT_PRESIGN_EXPIRES_SECS: u64 = 7 * 24 * 3600;

/// Configuration for the S3 backend.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket name
    pub bucket: String,
    /// Region
    pub region: String,
    /// Custom endpoint URL for S3-compatible providers
    pub endpoint_url: Option<String>,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Key prefix inside the bucket
    pub key_prefix: String,
    /// How long presigned download URLs stay valid
    pub presign_expires: Duration,
}

impl S3Config {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            bucket: std::env::var("S3_BUCKET")
                .map_err(|_| StorageError::config_error("S3_BUCKET not set"))?,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint_url: std::env::var("S3_ENDPOINT_URL").ok(),
            access_key_id: std::env::var("S3_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("S3_ACCESS_KEY not set"))?,
            secret_access_key: std::env::var("S3_SECRET_KEY")
                .map_err(|_| StorageError::config_error("S3_SECRET_KEY not set"))?,
            key_prefix: std::env::var("S3_KEY_PREFIX").unwrap_or_else(|_| "videos".to_string()),
            presign_expires: presign_expires_from_env(),
        })
    }
}

fn presign_expires_from_env() -> Duration {
    std::env::var("S3_PRESIGN_EXPIRES_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_PRESIGN_EXPIRES_SECS))
}

/// Uploads clips to an S3-compatible bucket and hands out presigned
/// download URLs instead of serving bytes itself.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    bucket: String,
    key_prefix: String,
    presign_expires: Duration,
}

impl S3Storage {
    /// Create a new S3 backend from configuration.
    pub fn new(config: S3Config) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "storycraft",
        );

        let mut builder = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);

        if let Some(endpoint) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        let client = Client::from_conf(builder.build());

        Self {
            client,
            bucket: config.bucket,
            key_prefix: config.key_prefix,
            presign_expires: config.presign_expires,
        }
    }

    /// Object key a job's clip is stored under.
    fn clip_key(&self, job_id: Uuid, ext: &str) -> String {
        format!(
            "{}/{}.{}",
            self.key_prefix.trim_end_matches('/'),
            job_id,
            ext
        )
    }

    async fn presign_get(&self, key: &str) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(self.presign_expires)
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
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "mp4" => "video/mp4",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl MediaStorage for S3Storage {
    async fn store(&self, job_id: Uuid, data: Vec<u8>, ext: &str) -> StorageResult<StoredLocation> {
        let key = self.clip_key(job_id, ext);
        debug!("Uploading {} bytes to {}", data.len(), key);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data))
            .content_type(content_type_for(ext))
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let url = self.presign_get(&key).await?;
        info!("Uploaded clip to {}", key);
        Ok(StoredLocation::RemoteUrl(url))
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
