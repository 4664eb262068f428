//! Video generation handlers.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storycraft_models::{JobStatus, StoredLocation, Style, VideoFormat, VideoJob};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::services::generation::GenerationRequest;
use crate::state::AppState;

fn default_seconds() -> i64 {
    4
}

#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    pub prompt: String,
    #[serde(default)]
    pub style: Style,
    #[serde(default)]
    pub format: VideoFormat,
    #[serde(default = "default_seconds")]
    pub seconds: i64,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBatchRequest {
    pub prompt: String,
    /// Styles to generate; absent or empty means every style.
    #[serde(default)]
    pub styles: Option<Vec<Style>>,
    #[serde(default)]
    pub format: VideoFormat,
    #[serde(default = "default_seconds")]
    pub seconds: i64,
    #[serde(default)]
    pub model: Option<String>,
}

/// One generation job as shown to its owner.
#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub id: Uuid,
    pub prompt: String,
    pub model: String,
    pub size: String,
    pub seconds: i64,
    pub openai_id: Option<String>,
    pub status: JobStatus,
    pub cost_credits: i64,
    pub file_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<VideoJob> for VideoResponse {
    fn from(job: VideoJob) -> Self {
        Self {
            id: job.id,
            prompt: job.prompt,
            model: job.model,
            size: job.size,
            seconds: job.seconds,
            openai_id: job.openai_id,
            status: job.status,
            cost_credits: job.cost_credits,
            file_url: job.file_url,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct VideoListResponse {
    pub items: Vec<VideoResponse>,
}

impl FromIterator<VideoJob> for VideoListResponse {
    fn from_iter<I: IntoIterator<Item = VideoJob>>(jobs: I) -> Self {
        Self {
            items: jobs.into_iter().map(Into::into).collect(),
        }
    }
}

/// Reserve credits and submit one clip. Returns the queued job with the
/// provider id already recorded.
pub async fn create_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateVideoRequest>,
) -> ApiResult<(StatusCode, Json<VideoResponse>)> {
    let job = state
        .generation
        .create_video(
            &user,
            GenerationRequest {
                prompt: request.prompt,
                format: request.format,
                seconds: request.seconds,
                model: request.model,
            },
            request.style,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(job.into())))
}

/// One clip per requested style, charged against a single up-front check.
pub async fn create_batch(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<CreateBatchRequest>,
) -> ApiResult<(StatusCode, Json<VideoListResponse>)> {
    let styles = match request.styles {
        Some(styles) if !styles.is_empty() => styles,
        _ => Style::ALL.to_vec(),
    };

    let jobs = state
        .generation
        .create_batch(
            &user,
            GenerationRequest {
                prompt: request.prompt,
                format: request.format,
                seconds: request.seconds,
                model: request.model,
            },
            &styles,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(jobs.into_iter().collect())))
}

/// The authenticated user's jobs, newest first.
pub async fn list_videos(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<VideoListResponse>> {
    let jobs = state.jobs.list_for_user(user.id).await?;
    Ok(Json(jobs.into_iter().collect()))
}

/// A single job by id.
pub async fn get_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<VideoResponse>> {
    let job_id = parse_job_id(&job_id)?;
    let job = state
        .jobs
        .get_owned(job_id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    Ok(Json(job.into()))
}

/// Poll the provider and advance the job's lifecycle.
pub async fn pull_video(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<String>,
) -> ApiResult<Json<VideoResponse>> {
    let job_id = parse_job_id(&job_id)?;
    let job = state.generation.pull_video(user.id, job_id).await?;
    Ok(Json(job.into()))
}

/// Serve a locally stored clip. Remote-stored clips are fetched through
/// their `file_url` instead.
pub async fn download_file(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job_id = parse_job_id(&job_id)?;
    let job = state
        .jobs
        .get_owned(job_id, user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("Video not found"))?;

    let path = match job.location() {
        Some(StoredLocation::LocalPath(path)) => path,
        Some(StoredLocation::RemoteUrl(_)) => {
            return Err(ApiError::bad_request("For S3, use file_url returned in job"));
        }
        None => return Err(ApiError::not_found("File not available (yet)")),
    };

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| ApiError::not_found("File not available (yet)"))?;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, bytes.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}.mp4\"", job.id),
        )
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

/// Job ids are UUIDs; anything else cannot name an existing job.
fn parse_job_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found("Video not found"))
}
