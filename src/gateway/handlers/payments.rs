//! Payment handlers (charge → verify)

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, CallbackQuery, ChargeApiRequest, VerifyRequest, ok,
};
use crate::core_types::PaymentId;
use crate::order::PaymentMethod;
use crate::payment::{ChargeContext, ChargeRequest, Payment, PaymentResult};

/// Gateway status for a completed user checkout
const CALLBACK_OK: &str = "OK";

/// POST /api/v1/payments/charge
pub async fn charge(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChargeApiRequest>,
) -> ApiResult<PaymentResult> {
    let method = req
        .method
        .parse::<PaymentMethod>()
        .map_err(ApiError::bad_request)?;
    let context = match req.order_id {
        Some(order_id) => ChargeContext::Order { order_id },
        None => ChargeContext::Topup,
    };

    let result = state
        .payments
        .charge(ChargeRequest {
            user_id: req.user_id,
            context,
            amount: req.amount.inner(),
            method,
        })
        .await?;
    ok(result)
}

/// POST /api/v1/payments/verify
pub async fn verify(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<PaymentResult> {
    let result = state
        .payments
        .verify(
            req.payment_id,
            req.authority.trim(),
            req.amount.map(|a| a.inner()),
        )
        .await?;
    ok(result)
}

/// GET /api/v1/payments/callback?payment_id=&Authority=&Status=
///
/// Where the gateway redirects the user. `Status=OK` verifies, anything
/// else cancels.
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(q): Query<CallbackQuery>,
) -> ApiResult<PaymentResult> {
    let result = if q.status.eq_ignore_ascii_case(CALLBACK_OK) {
        state.payments.verify(q.payment_id, &q.authority, None).await?
    } else {
        state.payments.cancel(q.payment_id, &q.authority).await?
    };
    ok(result)
}

/// GET /api/v1/payments/{id}
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    Path(payment_id): Path<PaymentId>,
) -> ApiResult<Payment> {
    ok(state.payments.payment(payment_id).await?)
}
