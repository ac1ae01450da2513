//! Purchase error types

use rust_decimal::Decimal;
use thiserror::Error;

use crate::card_issuer::CardIssuerError;
use crate::core_types::{OrderId, UserId};
use crate::coupon::CouponError;
use crate::inventory::InventoryError;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum PurchaseError {
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("User {0} is banned")]
    UserBanned(UserId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Out of stock: {0}")]
    OutOfStock(String),

    #[error("Coupon rejected: {0}")]
    CouponInvalid(#[source] CouponError),

    #[error("Fulfillment provider error: {0}")]
    FulfillmentProvider(#[from] CardIssuerError),

    #[error("Concurrent update, retry: {0}")]
    ConcurrencyConflict(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PurchaseError {
    /// Error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            PurchaseError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            PurchaseError::UserNotFound(_) => "USER_NOT_FOUND",
            PurchaseError::UserBanned(_) => "USER_BANNED",
            PurchaseError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            PurchaseError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            PurchaseError::OutOfStock(_) => "OUT_OF_STOCK",
            PurchaseError::CouponInvalid(e) => e.code(),
            PurchaseError::FulfillmentProvider(_) => "FULFILLMENT_PROVIDER_ERROR",
            PurchaseError::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            PurchaseError::Unexpected(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            PurchaseError::ProductNotFound(_)
            | PurchaseError::UserNotFound(_)
            | PurchaseError::OrderNotFound(_) => 404,
            PurchaseError::UserBanned(_) => 403,
            PurchaseError::CouponInvalid(_) => 400,
            PurchaseError::InsufficientFunds { .. } | PurchaseError::OutOfStock(_) => 422,
            PurchaseError::ConcurrencyConflict(_) => 409,
            PurchaseError::FulfillmentProvider(_) => 502,
            PurchaseError::Unexpected(_) => 500,
        }
    }
}

impl From<StoreError> for PurchaseError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => PurchaseError::ConcurrencyConflict(msg),
            other => PurchaseError::Unexpected(other.to_string()),
        }
    }
}

impl From<CouponError> for PurchaseError {
    fn from(e: CouponError) -> Self {
        match e {
            CouponError::Store(store) => store.into(),
            rejection => PurchaseError::CouponInvalid(rejection),
        }
    }
}

impl From<InventoryError> for PurchaseError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::OutOfStock(sku) => PurchaseError::OutOfStock(sku),
            InventoryError::ProductNotFound(sku) => PurchaseError::ProductNotFound(sku),
            InventoryError::Store(store) => store.into(),
            other => PurchaseError::Unexpected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coupon_rejection_keeps_its_code() {
        let err: PurchaseError = CouponError::UsageExhausted("OFF50".into()).into();
        assert!(matches!(err, PurchaseError::CouponInvalid(_)));
        assert_eq!(err.code(), "COUPON_EXHAUSTED");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn test_store_faults_are_not_business_errors() {
        let err: PurchaseError = CouponError::Store(StoreError::Conflict("40P01".into())).into();
        assert!(matches!(err, PurchaseError::ConcurrencyConflict(_)));

        let err: PurchaseError = InventoryError::Store(StoreError::Corrupt("bad status".into())).into();
        assert_eq!(err.code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_out_of_stock_distinct_from_not_found() {
        let oos: PurchaseError = InventoryError::OutOfStock("gpt_ready".into()).into();
        let missing = PurchaseError::ProductNotFound("gpt_ready".into());
        assert_ne!(oos.code(), missing.code());
    }
}
