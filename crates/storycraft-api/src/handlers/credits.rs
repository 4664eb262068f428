//! Account and credit ledger handlers.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use storycraft_models::{CreditEntry, User, REF_ADMIN_GRANT};

use crate::auth::{CurrentAdmin, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub credits: i64,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            credits: user.credits,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

/// One ledger entry as shown to the account owner.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: i64,
    #[serde(rename = "ref")]
    pub reference: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<CreditEntry> for TransactionResponse {
    fn from(entry: CreditEntry) -> Self {
        Self {
            id: entry.id,
            kind: entry.kind.as_str().to_string(),
            amount: entry.amount,
            reference: entry.reference,
            status: entry.status.as_str().to_string(),
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub items: Vec<TransactionResponse>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct GrantRequest {
    pub user_id: Uuid,
    #[validate(range(min = 1))]
    pub amount: i64,
}

/// The authenticated account.
pub async fn me(CurrentUser(user): CurrentUser) -> Json<UserResponse> {
    Json(user.into())
}

/// The authenticated account's ledger, newest first.
pub async fn list_transactions(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<TransactionListResponse>> {
    let entries = state.ledger.list_for_user(user.id).await?;
    Ok(Json(TransactionListResponse {
        items: entries.into_iter().map(Into::into).collect(),
    }))
}

/// Hand out credits to any account. Admin only.
pub async fn grant_credits(
    State(state): State<AppState>,
    CurrentAdmin(admin): CurrentAdmin,
    Json(request): Json<GrantRequest>,
) -> ApiResult<Json<TransactionResponse>> {
    request
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let entry = state
        .ledger
        .grant(request.user_id, request.amount, REF_ADMIN_GRANT)
        .await?;

    info!(
        admin_id = %admin.id,
        user_id = %request.user_id,
        amount = request.amount,
        "Admin granted credits"
    );

    Ok(Json(entry.into()))
}
