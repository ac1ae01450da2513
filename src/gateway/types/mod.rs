//! Gateway types module
//!
//! ## Input Types
//! - [`StrictAmount`]: Format-validated amount for API input
//! - request bodies and query strings below
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`ApiError`]: handler error, rendered with the component error code

pub mod money;
pub mod response;

use serde::Deserialize;

use crate::core_types::{OrderId, PaymentId, UserId};

pub use money::StrictAmount;
pub use response::{ApiError, ApiResponse, ApiResult, error_codes, ok};

/// `POST /orders/purchase` and `POST /orders`
#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub user_id: UserId,
    pub sku: String,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// `POST /payments/charge`
#[derive(Debug, Deserialize)]
pub struct ChargeApiRequest {
    pub user_id: UserId,
    pub amount: StrictAmount,
    /// `wallet` or `card`
    pub method: String,
    /// Absent for a wallet top-up
    #[serde(default)]
    pub order_id: Option<OrderId>,
}

/// `POST /payments/verify`
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub payment_id: PaymentId,
    pub authority: String,
    #[serde(default)]
    pub amount: Option<StrictAmount>,
}

/// Query string the gateway appends when redirecting the user back
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub payment_id: PaymentId,
    #[serde(rename = "Authority")]
    pub authority: String,
    /// `OK` when the user paid, anything else when they backed out
    #[serde(rename = "Status")]
    pub status: String,
}

/// `POST /coupons/validate`
#[derive(Debug, Deserialize)]
pub struct CouponValidateRequest {
    pub code: String,
    pub user_id: UserId,
    pub amount: StrictAmount,
}

/// `POST /users`
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub telegram_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub referral_code: Option<String>,
}

/// `GET /orders?limit=&offset=`
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_query_uses_gateway_casing() {
        let q: CallbackQuery =
            serde_json::from_str(r#"{"payment_id":7,"Authority":"A123","Status":"NOK"}"#).unwrap();
        assert_eq!(q.payment_id, 7);
        assert_eq!(q.authority, "A123");
        assert_eq!(q.status, "NOK");
    }

    #[test]
    fn test_charge_request_topup_has_no_order() {
        let r: ChargeApiRequest =
            serde_json::from_str(r#"{"user_id":1,"amount":"50000","method":"card"}"#).unwrap();
        assert!(r.order_id.is_none());
        assert_eq!(r.amount.inner().to_string(), "50000");
    }
}
