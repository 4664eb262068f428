//! Credit ledger entry models.
//!
//! Every change to a user's balance is recorded as a ledger entry, written
//! in the same transaction as the balance mutation. The ledger is append
//! only apart from the pending-spend transitions driven by the job
//! lifecycle (pending -> settled, or pending -> failed plus a refund).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Reference of a spend entry whose job has not been identified yet.
pub const REF_PENDING: &str = "pending";
/// Reference of the signup grant.
pub const REF_WELCOME: &str = "welcome";
/// Reference of a manual admin grant.
pub const REF_ADMIN_GRANT: &str = "admin_grant";
/// Reference of a spend that failed before the provider accepted the job,
/// and of the refund paired with it.
pub const REF_CREATE_ERROR: &str = "create_error";

/// Kind of credit movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Credits handed out (signup bonus, admin adjustment)
    Grant,
    /// Credits reserved or consumed by a generation job
    Spend,
    /// Credits returned after a failed job
    Refund,
    /// Credits bought with money (schema placeholder, no issuing flow)
    Purchase,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Grant => "grant",
            EntryKind::Spend => "spend",
            EntryKind::Refund => "refund",
            EntryKind::Purchase => "purchase",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = EntryKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grant" => Ok(EntryKind::Grant),
            "spend" => Ok(EntryKind::Spend),
            "refund" => Ok(EntryKind::Refund),
            "purchase" => Ok(EntryKind::Purchase),
            _ => Err(EntryKindParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown entry kind: {0}")]
pub struct EntryKindParseError(String);

/// Settlement state of a ledger entry.
///
/// Only spend entries ever hold `pending`; grants and refunds are written
/// `settled`. A `failed` spend is always paired with a settled refund of
/// equal magnitude written in the same transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Reservation made, outcome of the paid-for work unknown
    Pending,
    /// Final: the movement sticks
    Settled,
    /// Final: the spend did not happen, a refund restores the balance
    Failed,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Settled => "settled",
            EntryStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = EntryStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(EntryStatus::Pending),
            "settled" => Ok(EntryStatus::Settled),
            "failed" => Ok(EntryStatus::Failed),
            _ => Err(EntryStatusParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown entry status: {0}")]
pub struct EntryStatusParseError(String);

/// One movement of credits on a user's ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditEntry {
    pub id: Uuid,

    pub user_id: Uuid,

    pub kind: EntryKind,

    /// Signed amount; spend entries are negative, grants and refunds
    /// positive. The sum of all of a user's entries equals their balance.
    pub amount: i64,

    /// Correlation key: a job id once known, otherwise one of the
    /// `REF_*` markers.
    pub reference: String,

    pub status: EntryStatus,

    pub created_at: DateTime<Utc>,
}

impl CreditEntry {
    /// A settled grant of `amount` credits.
    pub fn grant(user_id: Uuid, amount: i64, reference: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind: EntryKind::Grant,
            amount,
            reference: reference.into(),
            status: EntryStatus::Settled,
            created_at: Utc::now(),
        }
    }

    /// A pending spend reserving `amount` credits (recorded negative),
    /// not yet correlated with a job.
    pub fn pending_spend(user_id: Uuid, amount: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind: EntryKind::Spend,
            amount: -amount,
            reference: REF_PENDING.to_string(),
            status: EntryStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// A settled refund returning `amount` credits.
    pub fn refund(user_id: Uuid, amount: i64, reference: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind: EntryKind::Refund,
            amount,
            reference: reference.into(),
            status: EntryStatus::Settled,
            created_at: Utc::now(),
        }
    }
}
