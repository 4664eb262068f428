//! OpenAI video API HTTP client.

use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::Client;
use tracing::{debug, info};

use crate::error::{OpenAiError, OpenAiResult};
use crate::types::{CreatedVideo, StatusPayload, SubmitPayload, VideoStatus};

/// Configuration for the OpenAI client.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Base URL of the API, e.g. "https://api.openai.com/v1"
    pub base_url: String,
    /// API key sent as a bearer token
    pub api_key: String,
    /// Timeout for video submissions
    pub submit_timeout: Duration,
    /// Timeout for status queries
    pub status_timeout: Duration,
    /// Timeout for content downloads
    pub download_timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            submit_timeout: Duration::from_secs(120),
            status_timeout: Duration::from_secs(60),
            download_timeout: Duration::from_secs(600),
        }
    }
}

impl OpenAiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or(defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            submit_timeout: env_secs("OPENAI_SUBMIT_TIMEOUT_SECS", defaults.submit_timeout),
            status_timeout: env_secs("OPENAI_STATUS_TIMEOUT_SECS", defaults.status_timeout),
            download_timeout: env_secs("OPENAI_DOWNLOAD_TIMEOUT_SECS", defaults.download_timeout),
        }
    }
}

fn env_secs(name: &str, default: Duration) -> Duration {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Client for the OpenAI video generation API.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new client. Timeouts are applied per request since the
    /// three operations have very different budgets.
    pub fn new(config: OpenAiConfig) -> OpenAiResult<Self> {
        let http = Client::builder().build().map_err(OpenAiError::Network)?;
        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> OpenAiResult<Self> {
        Self::new(OpenAiConfig::from_env())
    }

    /// Submit a prompt for generation. The provider answers with its own
    /// identifier, which every later status query and download uses.
    pub async fn submit(&self, prompt: &str, model: &str) -> OpenAiResult<CreatedVideo> {
        let url = format!("{}/videos", self.config.base_url);
        debug!(model, "Submitting video generation request");

        let form = Form::new()
            .text("model", model.to_string())
            .text("prompt", prompt.to_string());

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .timeout(self.config.submit_timeout)
            .send()
            .await?;

        let payload: SubmitPayload = Self::read_json(response).await?;
        let id = payload.id.ok_or(OpenAiError::MissingId)?;

        info!(openai_id = %id, "Video submission accepted");
        Ok(CreatedVideo {
            id,
            status: payload.status,
        })
    }

    /// Query the status of a submitted video.
    pub async fn get_video(&self, openai_id: &str) -> OpenAiResult<VideoStatus> {
        let url = format!("{}/videos/{}", self.config.base_url, openai_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.status_timeout)
            .send()
            .await?;

        let payload: StatusPayload = Self::read_json(response).await?;
        Ok(payload.into_status())
    }

    /// Download the finished clip's bytes.
    pub async fn download(&self, openai_id: &str) -> OpenAiResult<Vec<u8>> {
        let url = format!("{}/videos/{}/content", self.config.base_url, openai_id);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .timeout(self.config.download_timeout)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        let bytes = response.bytes().await?;
        debug!(openai_id, size = bytes.len(), "Downloaded video content");
        Ok(bytes.to_vec())
    }

    async fn check_status(response: reqwest::Response) -> OpenAiResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(OpenAiError::Api { status, body })
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> OpenAiResult<T> {
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}
