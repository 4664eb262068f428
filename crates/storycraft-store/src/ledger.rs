//! Credit ledger repository.
//!
//! Entries are written by the same transactions that mutate the balance;
//! the free functions at the bottom are the transaction-scoped pieces the
//! job lifecycle operations in [`crate::jobs`] compose with.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use storycraft_models::{CreditEntry, EntryKind, EntryStatus};

use crate::error::{StoreError, StoreResult};

#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    id: String,
    user_id: String,
    kind: String,
    amount: i64,
    reference: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl EntryRow {
    fn into_entry(self) -> StoreResult<CreditEntry> {
        Ok(CreditEntry {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| StoreError::decode(format!("entry id {}: {e}", self.id)))?,
            user_id: Uuid::parse_str(&self.user_id)
                .map_err(|e| StoreError::decode(format!("entry user id {}: {e}", self.user_id)))?,
            kind: self
                .kind
                .parse::<EntryKind>()
                .map_err(|e| StoreError::decode(format!("entry {}: {e}", self.id)))?,
            amount: self.amount,
            reference: self.reference,
            status: self
                .status
                .parse::<EntryStatus>()
                .map_err(|e| StoreError::decode(format!("entry {}: {e}", self.id)))?,
            created_at: self.created_at,
        })
    }
}

const SELECT_ENTRY: &str =
    "SELECT id, user_id, kind, amount, reference, status, created_at FROM credit_entries";

/// Repository for credit ledger entries.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: SqlitePool,
}

impl LedgerRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All entries for a user, newest first.
    pub async fn list_for_user(&self, user_id: Uuid) -> StoreResult<Vec<CreditEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            &format!("{SELECT_ENTRY} WHERE user_id = ?1 ORDER BY created_at DESC"),
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    /// Hand out credits: balance increment plus a settled grant entry, in
    /// one transaction.
    pub async fn grant(
        &self,
        user_id: Uuid,
        amount: i64,
        reference: &str,
    ) -> StoreResult<CreditEntry> {
        let mut tx = self.pool.begin().await?;

        if add_credits(&mut tx, user_id, amount).await? == 0 {
            return Err(StoreError::UserNotFound);
        }

        let entry = CreditEntry::grant(user_id, amount, reference);
        insert_entry(&mut tx, &entry).await?;

        tx.commit().await?;

        info!(user_id = %user_id, amount, reference, "Granted credits");
        Ok(entry)
    }
}

/// Append a ledger entry inside an open transaction.
pub(crate) async fn insert_entry(
    conn: &mut SqliteConnection,
    entry: &CreditEntry,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO credit_entries (id, user_id, kind, amount, reference, status, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(entry.id.to_string())
    .bind(entry.user_id.to_string())
    .bind(entry.kind.as_str())
    .bind(entry.amount)
    .bind(&entry.reference)
    .bind(entry.status.as_str())
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// The user's pending spend entry for `reference`, if any.
pub(crate) async fn find_pending_spend(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    reference: &str,
) -> StoreResult<Option<CreditEntry>> {
    let row = sqlx::query_as::<_, EntryRow>(&format!(
        "{SELECT_ENTRY} WHERE user_id = ?1 AND reference = ?2 \
         AND kind = 'spend' AND status = 'pending'"
    ))
    .bind(user_id.to_string())
    .bind(reference)
    .fetch_optional(&mut *conn)
    .await?;

    row.map(EntryRow::into_entry).transpose()
}

/// Point a spend entry at the job it paid for.
pub(crate) async fn correlate_entry(
    conn: &mut SqliteConnection,
    entry_id: Uuid,
    reference: &str,
) -> StoreResult<()> {
    sqlx::query("UPDATE credit_entries SET reference = ?2 WHERE id = ?1")
        .bind(entry_id.to_string())
        .bind(reference)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Finalize a pending entry as settled. The status guard makes a repeated
/// settle a no-op.
pub(crate) async fn settle_entry(conn: &mut SqliteConnection, entry_id: Uuid) -> StoreResult<()> {
    sqlx::query("UPDATE credit_entries SET status = 'settled' WHERE id = ?1 AND status = 'pending'")
        .bind(entry_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Finalize a pending entry as failed, rewriting its reference (the job id
/// on the poll path, the create-error marker on the submission path).
pub(crate) async fn fail_entry(
    conn: &mut SqliteConnection,
    entry_id: Uuid,
    reference: &str,
) -> StoreResult<()> {
    sqlx::query(
        "UPDATE credit_entries SET status = 'failed', reference = ?2 \
         WHERE id = ?1 AND status = 'pending'",
    )
    .bind(entry_id.to_string())
    .bind(reference)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Unconditionally add credits to a balance. Returns the number of user
/// rows touched (zero means no such user).
pub(crate) async fn add_credits(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    amount: i64,
) -> StoreResult<u64> {
    let result = sqlx::query("UPDATE users SET credits = credits + ?1 WHERE id = ?2")
        .bind(amount)
        .bind(user_id.to_string())
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

/// Subtract credits only if the balance covers the amount. Returns `false`
/// when the guard did not match, leaving the balance untouched; the caller
/// decides between a missing user and an insufficient balance.
pub(crate) async fn debit_credits_if_sufficient(
    conn: &mut SqliteConnection,
    user_id: Uuid,
    amount: i64,
) -> StoreResult<bool> {
    let result =
        sqlx::query("UPDATE users SET credits = credits - ?1 WHERE id = ?2 AND credits >= ?1")
            .bind(amount)
            .bind(user_id.to_string())
            .execute(&mut *conn)
            .await?;
    Ok(result.rows_affected() > 0)
}
