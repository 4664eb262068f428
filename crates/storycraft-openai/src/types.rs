//! Provider response types and status vocabulary.

use serde::Deserialize;

/// The provider's record of a newly submitted video.
#[derive(Debug, Clone)]
pub struct CreatedVideo {
    /// Provider-assigned identifier, used for all later queries.
    pub id: String,
    /// Initial status string, if the provider reported one.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitPayload {
    pub id: Option<String>,
    pub status: Option<String>,
}

/// Status report for a submitted video.
///
/// The raw status string is normalized to lowercase; some responses nest
/// it under `data`, and a missing field becomes the empty string (which
/// classifies as a failure).
#[derive(Debug, Clone)]
pub struct VideoStatus {
    pub status: String,
}

impl VideoStatus {
    pub fn classify(&self) -> RemoteStatus {
        RemoteStatus::classify(&self.status)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusPayload {
    pub status: Option<String>,
    pub data: Option<StatusData>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusData {
    pub status: Option<String>,
}

impl StatusPayload {
    pub(crate) fn into_status(self) -> VideoStatus {
        let raw = self
            .status
            .or(self.data.and_then(|d| d.status))
            .unwrap_or_default();
        VideoStatus {
            status: raw.to_lowercase(),
        }
    }
}

/// Provider status strings folded into the classes the backend acts on.
///
/// Only a small, known set means "still running"; `completed` means the
/// bytes are ready; every other string, unrecognized ones included, is a
/// failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    InProgress,
    Completed,
    Failed(String),
}

impl RemoteStatus {
    pub fn classify(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "queued" | "in_progress" | "processing" => RemoteStatus::InProgress,
            "completed" => RemoteStatus::Completed,
            other => RemoteStatus::Failed(other.to_string()),
        }
    }
}
