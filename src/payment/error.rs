//! Payment Error Types

use rust_decimal::Decimal;
use thiserror::Error;

use super::state::PaymentStatus;
use crate::core_types::{OrderId, PaymentId, UserId};
use crate::money::MoneyError;
use crate::order::OrderStatus;
use crate::store::StoreError;

#[derive(Error, Debug, Clone)]
pub enum PaymentError {
    // === Lookup ===
    #[error("Payment not found: {0}")]
    NotFound(PaymentId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Order {0} is {1}, only PENDING orders can be paid")]
    OrderNotPayable(OrderId, OrderStatus),

    #[error("User {0} is banned")]
    UserBanned(UserId),

    // === Validation ===
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid payment method: {0}")]
    InvalidMethod(String),

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Amount mismatch: expected {expected}, got {actual}")]
    AmountMismatch { expected: Decimal, actual: Decimal },

    #[error("Authority token does not match payment {0}")]
    AuthorityMismatch(PaymentId),

    #[error("Payment {id} is {status}, cannot {action}")]
    InvalidState {
        id: PaymentId,
        status: PaymentStatus,
        action: &'static str,
    },

    // === External / system ===
    #[error("Payment provider error: {0}")]
    ExternalProvider(String),

    #[error("Concurrent update, retry: {0}")]
    ConcurrencyConflict(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PaymentError {
    /// Error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            PaymentError::NotFound(_) => "PAYMENT_NOT_FOUND",
            PaymentError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            PaymentError::UserNotFound(_) => "USER_NOT_FOUND",
            PaymentError::OrderNotPayable(..) => "ORDER_NOT_PAYABLE",
            PaymentError::UserBanned(_) => "USER_BANNED",
            PaymentError::InvalidAmount(_) => "INVALID_AMOUNT",
            PaymentError::InvalidMethod(_) => "INVALID_METHOD",
            PaymentError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            PaymentError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            PaymentError::AuthorityMismatch(_) => "AUTHORITY_MISMATCH",
            PaymentError::InvalidState { .. } => "INVALID_STATE",
            PaymentError::ExternalProvider(_) => "EXTERNAL_PROVIDER_ERROR",
            PaymentError::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            PaymentError::Unexpected(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            PaymentError::NotFound(_)
            | PaymentError::OrderNotFound(_)
            | PaymentError::UserNotFound(_) => 404,
            PaymentError::UserBanned(_) => 403,
            PaymentError::InvalidAmount(_)
            | PaymentError::InvalidMethod(_)
            | PaymentError::AmountMismatch { .. }
            | PaymentError::AuthorityMismatch(_) => 400,
            PaymentError::InsufficientFunds { .. }
            | PaymentError::InvalidState { .. }
            | PaymentError::OrderNotPayable(..) => 422,
            PaymentError::ConcurrencyConflict(_) => 409,
            PaymentError::ExternalProvider(_) => 502,
            PaymentError::Unexpected(_) => 500,
        }
    }
}

impl From<StoreError> for PaymentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => PaymentError::ConcurrencyConflict(msg),
            other => PaymentError::Unexpected(other.to_string()),
        }
    }
}

impl From<MoneyError> for PaymentError {
    fn from(e: MoneyError) -> Self {
        PaymentError::InvalidAmount(e.to_string())
    }
}
