//! Video generation orchestration.
//!
//! This service ties the three external effects of a generation together:
//! the credit ledger, the provider, and media storage. The invariant it
//! maintains is that every submitted clip has exactly one reservation, and
//! every reservation ends settled (clip delivered) or refunded (clip
//! failed), never both.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use storycraft_models::{
    batch_cost, clip_cost, is_allowed_duration, NewVideoJob, Style, User, VideoFormat, VideoJob,
    DEFAULT_MODEL,
};
use storycraft_openai::{OpenAiClient, RemoteStatus};
use storycraft_storage::MediaStorage;
use storycraft_store::JobRepository;

use crate::error::{ApiError, ApiResult};
use crate::metrics;

/// File extension finished clips are stored under.
const CLIP_EXT: &str = "mp4";

/// Parameters shared by every clip of one generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub format: VideoFormat,
    pub seconds: i64,
    pub model: Option<String>,
}

/// Service orchestrating clip generation against the provider.
#[derive(Clone)]
pub struct GenerationService {
    jobs: JobRepository,
    openai: OpenAiClient,
    storage: Arc<dyn MediaStorage>,
    credits_per_second: i64,
}

impl GenerationService {
    /// Create a new generation service.
    pub fn new(
        jobs: JobRepository,
        openai: OpenAiClient,
        storage: Arc<dyn MediaStorage>,
        credits_per_second: i64,
    ) -> Self {
        Self {
            jobs,
            openai,
            storage,
            credits_per_second,
        }
    }

    /// Credits charged for a clip of `seconds` duration.
    pub fn clip_cost(&self, seconds: i64) -> i64 {
        clip_cost(seconds, self.credits_per_second)
    }

    /// Create a single clip: reserve credits, submit to the provider, and
    /// record the provider's identifier on the job.
    ///
    /// The balance pre-check here gives early, friendly rejection; the
    /// reservation itself re-checks atomically, so a stale `user` snapshot
    /// can never overspend.
    pub async fn create_video(
        &self,
        user: &User,
        request: GenerationRequest,
        style: Style,
    ) -> ApiResult<VideoJob> {
        if !is_allowed_duration(request.seconds) {
            return Err(ApiError::bad_request("Allowed seconds are 4, 8, or 12"));
        }

        let cost = self.clip_cost(request.seconds);
        if user.credits < cost {
            return Err(ApiError::bad_request(format!(
                "Not enough credits: need {}, have {}",
                cost, user.credits
            )));
        }

        self.reserve_and_submit(user.id, &request, style, cost).await
    }

    /// Create one clip per style, sequentially, against a single aggregate
    /// balance pre-check.
    ///
    /// Clips created before a failing submission stay created; the error
    /// from the failing clip is returned as-is, its own reservation already
    /// refunded.
    pub async fn create_batch(
        &self,
        user: &User,
        request: GenerationRequest,
        styles: &[Style],
    ) -> ApiResult<Vec<VideoJob>> {
        if !is_allowed_duration(request.seconds) {
            return Err(ApiError::bad_request("Allowed seconds are 4, 8, or 12"));
        }

        let cost = self.clip_cost(request.seconds);
        let total = batch_cost(styles.len(), request.seconds, self.credits_per_second);
        if user.credits < total {
            return Err(ApiError::bad_request(format!(
                "Not enough credits for batch: need {}, have {}",
                total, user.credits
            )));
        }

        let mut jobs = Vec::with_capacity(styles.len());
        for style in styles {
            let job = self
                .reserve_and_submit(user.id, &request, *style, cost)
                .await?;
            jobs.push(job);
        }

        Ok(jobs)
    }

    /// Poll the provider for a job's outcome and advance its lifecycle.
    ///
    /// Terminal jobs are returned untouched, so a poll can be repeated
    /// freely without re-settling or re-refunding anything. A completed
    /// generation is downloaded and stored before the job flips to
    /// `completed`; a reported failure refunds the reservation.
    pub async fn pull_video(&self, user_id: Uuid, job_id: Uuid) -> ApiResult<VideoJob> {
        let job = self
            .jobs
            .get_owned(job_id, user_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Video not found"))?;

        if job.is_terminal() {
            return Ok(job);
        }

        let openai_id = job
            .openai_id
            .as_deref()
            .ok_or_else(|| ApiError::bad_request("OpenAI id unknown for this job"))?;

        let status = self
            .openai
            .get_video(openai_id)
            .await
            .map_err(|e| ApiError::bad_gateway(format!("OpenAI check/download error: {e}")))?;

        match status.classify() {
            RemoteStatus::InProgress => {
                let job = self.jobs.mark_processing(job.id).await?;
                Ok(job)
            }
            RemoteStatus::Completed => {
                let bytes = self.openai.download(openai_id).await.map_err(|e| {
                    ApiError::bad_gateway(format!("OpenAI check/download error: {e}"))
                })?;
                let location = self.storage.store(job.id, bytes, CLIP_EXT).await?;
                let job = self.jobs.complete_and_settle(job.id, &location).await?;
                metrics::record_job_completed(job.style.as_str());
                Ok(job)
            }
            RemoteStatus::Failed(reason) => {
                warn!(job_id = %job.id, reason = %reason, "Provider reported generation failure");
                let job = self.jobs.fail_and_refund(job.id).await?;
                metrics::record_job_failed(job.style.as_str(), "generation");
                metrics::record_credits_refunded(job.cost_credits);
                Ok(job)
            }
        }
    }

    /// Reserve credits for one clip and submit it to the provider. A
    /// rejected submission refunds the reservation before surfacing the
    /// provider error.
    async fn reserve_and_submit(
        &self,
        user_id: Uuid,
        request: &GenerationRequest,
        style: Style,
        cost: i64,
    ) -> ApiResult<VideoJob> {
        let prompt = style.compose_prompt(&request.prompt);
        let model = request
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let (job, entry) = self
            .jobs
            .reserve_and_create(NewVideoJob {
                user_id,
                prompt: prompt.clone(),
                style,
                model: model.clone(),
                size: request.format.size().to_string(),
                seconds: request.seconds,
                cost_credits: cost,
            })
            .await?;
        metrics::record_job_created(style.as_str());

        match self.openai.submit(&prompt, &model).await {
            Ok(created) => {
                let job = self.jobs.mark_submitted(job.id, entry.id, &created.id).await?;
                info!(
                    job_id = %job.id,
                    style = %style,
                    seconds = request.seconds,
                    cost_credits = cost,
                    "Submitted clip to provider"
                );
                Ok(job)
            }
            Err(e) => {
                warn!(job_id = %job.id, error = %e, "Provider rejected submission");
                self.jobs
                    .refund_submission_failure(user_id, entry.id, cost)
                    .await?;
                metrics::record_job_failed(style.as_str(), "submit");
                metrics::record_credits_refunded(cost);
                Err(ApiError::bad_gateway(format!("OpenAI error: {e}")))
            }
        }
    }
}
