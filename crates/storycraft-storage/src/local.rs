//! Local filesystem storage backend.

use std::path::PathBuf;

use async_trait::async_trait;
use storycraft_models::StoredLocation;
use tracing::info;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::MediaStorage;

/// Keeps finished clips as plain files under a configurable directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path a job's clip is written to.
    pub fn clip_path(&self, job_id: Uuid, ext: &str) -> PathBuf {
        self.root.join(format!("{job_id}.{ext}"))
    }
}

#[async_trait]
impl MediaStorage for LocalStorage {
    async fn store(&self, job_id: Uuid, data: Vec<u8>, ext: &str) -> StorageResult<StoredLocation> {
        tokio::fs::create_dir_all(&self.root).await?;

        let path = self.clip_path(job_id, ext);
        tokio::fs::write(&path, &data).await?;

        info!("Stored {} bytes at {}", data.len(), path.display());
        Ok(StoredLocation::LocalPath(
            path.to_string_lossy().into_owned(),
        ))
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
