//! Read-only order queries

use std::sync::Arc;

use super::error::PurchaseError;
use super::models::Order;
use crate::core_types::{OrderId, UserId};
use crate::store::Store;

/// Admin listing page size cap
pub const MAX_PAGE_SIZE: i64 = 500;

pub struct OrderLedger {
    store: Arc<dyn Store>,
}

impl OrderLedger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn order(&self, order_id: OrderId) -> Result<Order, PurchaseError> {
        self.store
            .order(order_id)
            .await?
            .ok_or(PurchaseError::OrderNotFound(order_id))
    }

    /// All orders, newest first.
    pub async fn orders(&self, limit: i64, offset: i64) -> Result<Vec<Order>, PurchaseError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        Ok(self.store.orders(limit, offset.max(0)).await?)
    }

    /// A user's purchase history, newest first.
    pub async fn orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>, PurchaseError> {
        Ok(self.store.orders_by_user(user_id).await?)
    }
}
