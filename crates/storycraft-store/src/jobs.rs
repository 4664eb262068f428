//! Video job repository and the coupled job/ledger lifecycle transactions.
//!
//! Each operation here is one durable transaction. The balance, the ledger
//! and the job table only ever change together, which is what keeps the
//! three views of a user's credits consistent.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use storycraft_models::{
    CreditEntry, JobStatus, NewVideoJob, StoredLocation, Style, VideoJob, REF_CREATE_ERROR,
};

use crate::error::{StoreError, StoreResult};
use crate::ledger;

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    user_id: String,
    prompt: String,
    style: String,
    model: String,
    size: String,
    seconds: i64,
    openai_id: Option<String>,
    status: String,
    cost_credits: i64,
    file_path: Option<String>,
    file_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn into_job(self) -> StoreResult<VideoJob> {
        Ok(VideoJob {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| StoreError::decode(format!("job id {}: {e}", self.id)))?,
            user_id: Uuid::parse_str(&self.user_id)
                .map_err(|e| StoreError::decode(format!("job user id {}: {e}", self.user_id)))?,
            prompt: self.prompt,
            style: self
                .style
                .parse::<Style>()
                .map_err(|e| StoreError::decode(format!("job {}: {e}", self.id)))?,
            model: self.model,
            size: self.size,
            seconds: self.seconds,
            openai_id: self.openai_id,
            status: self
                .status
                .parse::<JobStatus>()
                .map_err(|e| StoreError::decode(format!("job {}: {e}", self.id)))?,
            cost_credits: self.cost_credits,
            file_path: self.file_path,
            file_url: self.file_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_JOB: &str = "SELECT id, user_id, prompt, style, model, size, seconds, openai_id, \
                          status, cost_credits, file_path, file_url, created_at, updated_at \
                          FROM video_jobs";

/// Repository for video jobs and their lifecycle transitions.
#[derive(Debug, Clone)]
pub struct JobRepository {
    pool: SqlitePool,
}

impl JobRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A job by id, only if `user_id` owns it.
    pub async fn get_owned(&self, id: Uuid, user_id: Uuid) -> StoreResult<Option<VideoJob>> {
        let row =
            sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOB} WHERE id = ?1 AND user_id = ?2"))
                .bind(id.to_string())
                .bind(user_id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        row.map(JobRow::into_job).transpose()
    }

    /// All of a user's jobs, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<VideoJob>> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "{SELECT_JOB} WHERE user_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::into_job).collect()
    }

    /// Reserve credits and create the job in one transaction: conditional
    /// balance decrement, pending spend entry, `queued` job row. Nothing is
    /// written when the balance cannot cover the cost.
    pub async fn reserve_and_create(
        &self,
        new_job: NewVideoJob,
    ) -> StoreResult<(VideoJob, CreditEntry)> {
        let cost = new_job.cost_credits;
        let user_id = new_job.user_id;

        let mut tx = self.pool.begin().await?;

        if !ledger::debit_credits_if_sufficient(&mut tx, user_id, cost).await? {
            let available =
                sqlx::query_scalar::<_, i64>("SELECT credits FROM users WHERE id = ?1")
                    .bind(user_id.to_string())
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match available {
                Some(available) => StoreError::InsufficientCredits {
                    needed: cost,
                    available,
                },
                None => StoreError::UserNotFound,
            });
        }

        let entry = CreditEntry::pending_spend(user_id, cost);
        ledger::insert_entry(&mut tx, &entry).await?;

        let now = Utc::now();
        let job = VideoJob {
            id: Uuid::new_v4(),
            user_id,
            prompt: new_job.prompt,
            style: new_job.style,
            model: new_job.model,
            size: new_job.size,
            seconds: new_job.seconds,
            openai_id: None,
            status: JobStatus::Queued,
            cost_credits: cost,
            file_path: None,
            file_url: None,
            created_at: now,
            updated_at: now,
        };
        insert_job(&mut tx, &job).await?;

        tx.commit().await?;

        info!(
            job_id = %job.id,
            user_id = %user_id,
            cost_credits = cost,
            "Reserved credits and queued job"
        );
        Ok((job, entry))
    }

    /// The provider accepted the submission: persist its identifier and
    /// correlate the reservation with the job id, in one transaction.
    pub async fn mark_submitted(
        &self,
        job_id: Uuid,
        entry_id: Uuid,
        openai_id: &str,
    ) -> StoreResult<VideoJob> {
        let mut tx = self.pool.begin().await?;

        let touched =
            sqlx::query("UPDATE video_jobs SET openai_id = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(job_id.to_string())
                .bind(openai_id)
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?
                .rows_affected();
        if touched == 0 {
            return Err(StoreError::JobNotFound(job_id.to_string()));
        }

        ledger::correlate_entry(&mut tx, entry_id, &job_id.to_string()).await?;

        tx.commit().await?;

        let job = self.get(job_id).await?;
        info!(job_id = %job.id, openai_id, "Job accepted by provider");
        Ok(job)
    }

    /// The provider reports the generation still running.
    pub async fn mark_processing(&self, job_id: Uuid) -> StoreResult<VideoJob> {
        let touched =
            sqlx::query("UPDATE video_jobs SET status = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(job_id.to_string())
                .bind(JobStatus::Processing.as_str())
                .bind(Utc::now())
                .execute(&self.pool)
                .await?
                .rows_affected();
        if touched == 0 {
            return Err(StoreError::JobNotFound(job_id.to_string()));
        }

        self.get(job_id).await
    }

    /// The generation finished: record the output location, mark the job
    /// `completed` and settle its pending spend entry, in one transaction.
    /// The balance does not move (it was already debited at reservation).
    pub async fn complete_and_settle(
        &self,
        job_id: Uuid,
        location: &StoredLocation,
    ) -> StoreResult<VideoJob> {
        let (file_path, file_url) = match location {
            StoredLocation::LocalPath(path) => (Some(path.as_str()), None),
            StoredLocation::RemoteUrl(url) => (None, Some(url.as_str())),
        };

        let mut tx = self.pool.begin().await?;

        let job = fetch_job(&mut tx, job_id)
            .await?
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;

        sqlx::query(
            "UPDATE video_jobs SET status = ?2, file_path = ?3, file_url = ?4, updated_at = ?5 \
             WHERE id = ?1",
        )
        .bind(job_id.to_string())
        .bind(JobStatus::Completed.as_str())
        .bind(file_path)
        .bind(file_url)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        match ledger::find_pending_spend(&mut tx, job.user_id, &job_id.to_string()).await? {
            Some(spend) => ledger::settle_entry(&mut tx, spend.id).await?,
            None => warn!(job_id = %job_id, "No pending spend entry to settle"),
        }

        tx.commit().await?;

        info!(job_id = %job_id, "Job completed, spend settled");
        self.get(job_id).await
    }

    /// The generation failed: mark the job `failed` and, if its spend entry
    /// is still pending, fail it, write the paired refund entry and restore
    /// the balance, in one transaction. A job whose spend was already
    /// finalized gets no second refund.
    pub async fn fail_and_refund(&self, job_id: Uuid) -> StoreResult<VideoJob> {
        let mut tx = self.pool.begin().await?;

        let job = fetch_job(&mut tx, job_id)
            .await?
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;

        sqlx::query("UPDATE video_jobs SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(job_id.to_string())
            .bind(JobStatus::Failed.as_str())
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        let reference = job_id.to_string();
        if let Some(spend) = ledger::find_pending_spend(&mut tx, job.user_id, &reference).await? {
            ledger::fail_entry(&mut tx, spend.id, &reference).await?;
            let refund = CreditEntry::refund(job.user_id, job.cost_credits, &reference);
            ledger::insert_entry(&mut tx, &refund).await?;
            ledger::add_credits(&mut tx, job.user_id, job.cost_credits).await?;
            info!(
                job_id = %job_id,
                user_id = %job.user_id,
                refunded = job.cost_credits,
                "Job failed, reservation refunded"
            );
        }

        tx.commit().await?;

        self.get(job_id).await
    }

    /// The provider rejected the submission before assigning an id: fail
    /// the reservation under the create-error marker, write the paired
    /// refund entry and restore the balance, in one transaction. The
    /// `queued` job row is retained without a provider id.
    pub async fn refund_submission_failure(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        amount: i64,
    ) -> StoreResult<CreditEntry> {
        let mut tx = self.pool.begin().await?;

        ledger::fail_entry(&mut tx, entry_id, REF_CREATE_ERROR).await?;

        let refund = CreditEntry::refund(user_id, amount, REF_CREATE_ERROR);
        ledger::insert_entry(&mut tx, &refund).await?;

        if ledger::add_credits(&mut tx, user_id, amount).await? == 0 {
            return Err(StoreError::UserNotFound);
        }

        tx.commit().await?;

        info!(user_id = %user_id, refunded = amount, "Submission failed, reservation refunded");
        Ok(refund)
    }

    async fn get(&self, job_id: Uuid) -> StoreResult<VideoJob> {
        let row = sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOB} WHERE id = ?1"))
            .bind(job_id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;

        row.into_job()
    }
}

async fn insert_job(conn: &mut SqliteConnection, job: &VideoJob) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO video_jobs (id, user_id, prompt, style, model, size, seconds, openai_id, \
         status, cost_credits, file_path, file_url, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )
    .bind(job.id.to_string())
    .bind(job.user_id.to_string())
    .bind(&job.prompt)
    .bind(job.style.as_str())
    .bind(&job.model)
    .bind(&job.size)
    .bind(job.seconds)
    .bind(job.openai_id.as_deref())
    .bind(job.status.as_str())
    .bind(job.cost_credits)
    .bind(job.file_path.as_deref())
    .bind(job.file_url.as_deref())
    .bind(job.created_at)
    .bind(job.updated_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn fetch_job(conn: &mut SqliteConnection, job_id: Uuid) -> StoreResult<Option<VideoJob>> {
    let row = sqlx::query_as::<_, JobRow>(&format!("{SELECT_JOB} WHERE id = ?1"))
        .bind(job_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    row.map(JobRow::into_job).transpose()
}
