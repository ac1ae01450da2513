//! Purchase and order ledger handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::super::state::AppState;
use super::super::types::{ApiError, ApiResult, PageQuery, PurchaseRequest, ok};
use crate::core_types::{OrderId, UserId};
use crate::order::{Order, OrderResult};

/// POST /api/v1/orders/purchase
///
/// Buy from the wallet in one step.
pub async fn purchase(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PurchaseRequest>,
) -> ApiResult<OrderResult> {
    let sku = req.sku.trim();
    if sku.is_empty() {
        return ApiError::bad_request("sku is required").into_err();
    }
    let result = state
        .orders
        .purchase(req.user_id, sku, req.coupon_code.as_deref())
        .await?;
    ok(result)
}

/// POST /api/v1/orders
///
/// Create a PENDING order to be paid through `/payments/charge`.
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PurchaseRequest>,
) -> ApiResult<OrderResult> {
    let sku = req.sku.trim();
    if sku.is_empty() {
        return ApiError::bad_request("sku is required").into_err();
    }
    let result = state
        .orders
        .place_order(req.user_id, sku, req.coupon_code.as_deref())
        .await?;
    ok(result)
}

/// GET /api/v1/orders/{id}
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(order_id): Path<OrderId>,
) -> ApiResult<Order> {
    ok(state.ledger.order(order_id).await?)
}

/// GET /api/v1/orders?limit=&offset=
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<Order>> {
    ok(state.ledger.orders(page.limit, page.offset).await?)
}

/// GET /api/v1/users/{user_id}/orders
pub async fn user_orders(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> ApiResult<Vec<Order>> {
    ok(state.ledger.orders_by_user(user_id).await?)
}
