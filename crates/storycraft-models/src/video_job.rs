//! Video generation job models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::style::Style;

/// Provider model requested when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "sora-2";

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created and reserved, provider outcome unknown
    #[default]
    Queued,
    /// Provider reported the generation is still running
    Processing,
    /// Output downloaded and stored, spend settled
    Completed,
    /// Provider reported failure, spend refunded
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = JobStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(JobStatusParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown job status: {0}")]
pub struct JobStatusParseError(String);

/// Where a finished clip's bytes ended up.
///
/// Exactly one of the two is ever recorded on a job: a path when the
/// service stores files on its own disk, a URL when an object store
/// serves them directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredLocation {
    LocalPath(String),
    RemoteUrl(String),
}

/// One user-requested generation unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoJob {
    pub id: Uuid,

    pub user_id: Uuid,

    /// Final rendered prompt (style prefix already applied).
    pub prompt: String,

    pub style: Style,

    /// Provider model name, e.g. "sora-2".
    pub model: String,

    /// Target pixel size, e.g. "1280x720".
    pub size: String,

    /// Clip duration; one of 4, 8 or 12.
    pub seconds: i64,

    /// Identifier assigned by the provider; absent until the provider
    /// accepts the submission.
    pub openai_id: Option<String>,

    pub status: JobStatus,

    /// Credits reserved for this job, fixed at creation.
    pub cost_credits: i64,

    pub file_path: Option<String>,

    pub file_url: Option<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl VideoJob {
    /// The stored output location, if the job completed.
    pub fn location(&self) -> Option<StoredLocation> {
        match (&self.file_path, &self.file_url) {
            (Some(path), _) => Some(StoredLocation::LocalPath(path.clone())),
            (None, Some(url)) => Some(StoredLocation::RemoteUrl(url.clone())),
            (None, None) => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Parameters for creating a job; identifiers and timestamps are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewVideoJob {
    pub user_id: Uuid,
    pub prompt: String,
    pub style: Style,
    pub model: String,
    pub size: String,
    pub seconds: i64,
    pub cost_credits: i64,
}
