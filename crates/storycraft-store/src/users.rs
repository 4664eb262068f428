//! User repository.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use tracing::info;
use uuid::Uuid;

use storycraft_models::{CreditEntry, User, REF_WELCOME};

use crate::error::{StoreError, StoreResult};
use crate::ledger;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    credits: i64,
    is_admin: bool,
    created_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> StoreResult<User> {
        Ok(User {
            id: Uuid::parse_str(&self.id)
                .map_err(|e| StoreError::decode(format!("user id {}: {e}", self.id)))?,
            email: self.email,
            password_hash: self.password_hash,
            credits: self.credits,
            is_admin: self.is_admin,
            created_at: self.created_at,
        })
    }
}

const SELECT_USER: &str =
    "SELECT id, email, password_hash, credits, is_admin, created_at FROM users";

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register an account: the user row and its welcome grant entry are
    /// committed together. A duplicate email fails with `EmailTaken`.
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        welcome_credits: i64,
    ) -> StoreResult<User> {
        if self.find_by_email(email).await?.is_some() {
            return Err(StoreError::EmailTaken);
        }

        let user = User::new(email, password_hash, welcome_credits);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, credits, is_admin, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.credits)
        .bind(user.is_admin)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from_insert)?;

        let grant = CreditEntry::grant(user.id, welcome_credits, REF_WELCOME);
        ledger::insert_entry(&mut tx, &grant).await?;

        tx.commit().await?;

        info!(user_id = %user.id, credits = welcome_credits, "Registered user");
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE email = ?1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }

    pub async fn get(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{SELECT_USER} WHERE id = ?1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_user).transpose()
    }
}
