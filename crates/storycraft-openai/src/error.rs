//! Provider client error types.

use thiserror::Error;

pub type OpenAiResult<T> = Result<T, OpenAiError>;

#[derive(Debug, Error)]
pub enum OpenAiError {
    #[error("OpenAI API returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("OpenAI response missing id")]
    MissingId,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl OpenAiError {
    pub fn is_retryable(&self) -> bool {
        match self {
            OpenAiError::Network(_) => true,
            OpenAiError::Api { status, .. } => {
                status.is_server_error() || *status == reqwest::StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }
}
