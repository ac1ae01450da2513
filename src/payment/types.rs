//! Payment records and request/response types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::state::PaymentStatus;
use crate::core_types::{OrderId, PaymentId, UserId};
use crate::order::PaymentMethod;

/// One wallet top-up or gateway charge attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    /// `None` for a wallet top-up
    pub order_id: Option<OrderId>,
    pub user_id: UserId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    /// Locally generated, unique
    pub transaction_id: String,
    /// Gateway authority token, set on entering VERIFYING. Never serialised:
    /// it is the only secret a callback carries.
    #[serde(skip_serializing)]
    pub authority: Option<String>,
    /// Gateway reference id, set on COMPLETED
    pub reference_number: Option<String>,
    /// Redirect URL for the user; embeds the authority
    #[serde(skip_serializing)]
    pub verification_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

/// Insert payload for a payment
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub order_id: Option<OrderId>,
    pub user_id: UserId,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub method: PaymentMethod,
    pub transaction_id: String,
}

/// What the money is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChargeContext {
    /// Add funds to the wallet
    Topup,
    /// Pay a pending order
    Order { order_id: OrderId },
}

impl ChargeContext {
    pub fn order_id(&self) -> Option<OrderId> {
        match self {
            ChargeContext::Topup => None,
            ChargeContext::Order { order_id } => Some(*order_id),
        }
    }
}

/// Charge request
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    pub user_id: UserId,
    pub context: ChargeContext,
    pub amount: Decimal,
    pub method: PaymentMethod,
}

/// Result returned by charge / verify / cancel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentResult {
    pub payment_id: PaymentId,
    pub transaction_id: String,
    pub order_id: Option<OrderId>,
    pub amount: Decimal,
    pub status: PaymentStatus,
    /// Where to send the user (card method, VERIFYING only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl From<&Payment> for PaymentResult {
    fn from(p: &Payment) -> Self {
        Self {
            payment_id: p.id,
            transaction_id: p.transaction_id.clone(),
            order_id: p.order_id,
            amount: p.amount,
            status: p.status,
            redirect_url: match p.status {
                PaymentStatus::Verifying => p.verification_url.clone(),
                _ => None,
            },
            reference_number: p.reference_number.clone(),
            error_message: p.error_message.clone(),
        }
    }
}

/// Generate a unique transaction id: `TXN-{ulid}`.
pub fn new_transaction_id() -> String {
    format!("TXN-{}", ulid::Ulid::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_ids_are_unique() {
        let a = new_transaction_id();
        let b = new_transaction_id();
        assert!(a.starts_with("TXN-"));
        assert_eq!(a.len(), 4 + 26);
        assert_ne!(a, b);
    }

    #[test]
    fn test_charge_context() {
        assert_eq!(ChargeContext::Topup.order_id(), None);
        assert_eq!(ChargeContext::Order { order_id: 5 }.order_id(), Some(5));
    }
}
