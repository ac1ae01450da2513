//! User registration and wallet balance

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, CreateUserRequest, ok};
use crate::account::{User, UserProfile, WalletAccount};
use crate::core_types::UserId;

/// POST /api/v1/users
///
/// Get-or-create on first contact from the chat layer.
pub async fn get_or_create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<User> {
    if req.telegram_id <= 0 {
        return ApiError::bad_request("telegram_id must be positive").into_err();
    }
    let profile = UserProfile {
        username: req.username,
        first_name: req.first_name,
        last_name: req.last_name,
    };
    let user = state
        .users
        .get_or_create(req.telegram_id, profile, req.referral_code.as_deref())
        .await?;
    ok(user)
}

/// GET /api/v1/users/{user_id}/balance
pub async fn balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> ApiResult<WalletAccount> {
    ok(state.users.balance(user_id).await?)
}
