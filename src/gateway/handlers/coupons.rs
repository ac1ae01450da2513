//! Coupon preview and listing

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};

use super::super::state::AppState;
use super::super::types::{ApiResult, CouponValidateRequest, ok};
use crate::core_types::UserId;
use crate::coupon::{Coupon, Discount};

/// POST /api/v1/coupons/validate
///
/// Preview only; never consumes a use.
pub async fn validate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CouponValidateRequest>,
) -> ApiResult<Discount> {
    let discount = state
        .coupons
        .validate(req.code.trim(), req.user_id, req.amount.inner())
        .await?;
    ok(discount)
}

/// GET /api/v1/users/{user_id}/coupons
pub async fn user_coupons(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Vec<Coupon>> {
    ok(state.coupons.available_for(user_id).await?)
}
