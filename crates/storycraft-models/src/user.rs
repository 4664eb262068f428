//! User account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account with a prepaid credit balance.
///
/// `credits` is the mutable balance; it is only ever changed by an
/// operation that appends a matching ledger entry in the same transaction,
/// so the ledger can always reconstruct it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    pub email: String,

    /// Argon2 hash, never the plaintext password.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Remaining prepaid credits.
    pub credits: i64,

    pub is_admin: bool,

    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a new account with an initial balance.
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>, credits: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            credits,
            is_admin: false,
            created_at: Utc::now(),
        }
    }
}
