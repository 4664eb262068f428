//! Media storage backends for generated clips.
//!
//! A finished clip is persisted exactly once per job, either to the local
//! filesystem or to an S3-compatible bucket. The backend reports where the
//! bytes landed so the job record can point clients at the right place:
//! a server-relative file for local storage, a presigned URL for S3.

pub mod error;
pub mod local;
pub mod s3;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use storycraft_models::StoredLocation;
use uuid::Uuid;

pub use error::{StorageError, StorageResult};
pub use local::LocalStorage;
pub use s3::{S3Config, S3Storage};

/// Destination for finished clips.
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Persist a clip's bytes under `{job_id}.{ext}` and report where they
    /// landed.
    async fn store(&self, job_id: Uuid, data: Vec<u8>, ext: &str)
        -> StorageResult<StoredLocation>;

    /// Short backend label for logs.
    fn backend_name(&self) -> &'static str;
}

/// Which storage backend to use.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local { root: PathBuf },
    S3(S3Config),
}

impl StorageConfig {
    /// Read the backend selection from environment variables.
    ///
    /// `STORAGE_BACKEND` picks the backend ("local" by default); the
    /// S3 variant additionally requires bucket and credential variables.
    pub fn from_env() -> StorageResult<Self> {
        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".to_string());
        match backend.as_str() {
            "local" => Ok(Self::Local {
                root: std::env::var("STORAGE_LOCAL_PATH")
                    .unwrap_or_else(|_| "./data/videos".to_string())
                    .into(),
            }),
            "s3" => Ok(Self::S3(S3Config::from_env()?)),
            other => Err(StorageError::config_error(format!(
                "Unknown STORAGE_BACKEND: {other}"
            ))),
        }
    }

    /// Build the configured backend.
    pub fn build(self) -> Arc<dyn MediaStorage> {
        match self {
            Self::Local { root } => Arc::new(LocalStorage::new(root)),
            Self::S3(config) => Arc::new(S3Storage::new(config)),
        }
    }
}
