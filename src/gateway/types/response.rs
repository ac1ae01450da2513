//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `ApiError`: error half of every handler result
//! - `error_codes`: Standard numeric code constants

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::account::AccountError;
use crate::coupon::CouponError;
use crate::inventory::InventoryError;
use crate::order::PurchaseError;
use crate::payment::PaymentError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - error: stable machine-readable error name (errors only)
/// - data: actual data (success) or absent (error)
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            error: None,
            data: Some(data),
        }
    }
}

/// Standard numeric codes
pub mod error_codes {
    /// Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_FUNDS: i32 = 1002;
    pub const OUT_OF_STOCK: i32 = 1003;
    pub const COUPON_INVALID: i32 = 1004;

    // Access (2xxx)
    pub const FORBIDDEN: i32 = 2003;

    // Resource (4xxx)
    pub const NOT_FOUND: i32 = 4001;
    pub const STATE_CONFLICT: i32 = 4009;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const PROVIDER_ERROR: i32 = 5002;
}

// ============================================================================
// ApiError
// ============================================================================

/// Error returned by handlers; renders as `ApiResponse<()>`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub error: &'static str,
    pub msg: String,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap a success payload.
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::success(data)))
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, error: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            error,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_PARAMETER,
            "INVALID_PARAMETER",
            msg,
        )
    }

    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            msg,
        )
    }

    /// Build from a component error's `code()` and HTTP status suggestion.
    pub fn from_domain(http_status: u16, error: &'static str, msg: String) -> Self {
        let status = StatusCode::from_u16(http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, numeric_code(status, error), error, msg)
    }

    pub fn into_err<T>(self) -> ApiResult<T> {
        Err(self)
    }
}

fn numeric_code(status: StatusCode, error: &str) -> i32 {
    match error {
        "INSUFFICIENT_FUNDS" => return error_codes::INSUFFICIENT_FUNDS,
        "OUT_OF_STOCK" => return error_codes::OUT_OF_STOCK,
        e if e.starts_with("COUPON_") => return error_codes::COUPON_INVALID,
        _ => {}
    }
    match status.as_u16() {
        400 => error_codes::INVALID_PARAMETER,
        403 => error_codes::FORBIDDEN,
        404 => error_codes::NOT_FOUND,
        409 | 422 => error_codes::STATE_CONFLICT,
        502 => error_codes::PROVIDER_ERROR,
        503 => error_codes::SERVICE_UNAVAILABLE,
        _ => error_codes::INTERNAL_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = self.error, msg = %self.msg, "Request failed");
        }
        let body = ApiResponse::<()> {
            code: self.code,
            msg: self.msg,
            error: Some(self.error),
            data: None,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<PurchaseError> for ApiError {
    fn from(e: PurchaseError) -> Self {
        Self::from_domain(e.http_status(), e.code(), e.to_string())
    }
}

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        Self::from_domain(e.http_status(), e.code(), e.to_string())
    }
}

impl From<CouponError> for ApiError {
    fn from(e: CouponError) -> Self {
        let status = match e {
            CouponError::Store(_) => 500,
            _ => 400,
        };
        Self::from_domain(status, e.code(), e.to_string())
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        let status = match &e {
            AccountError::UserNotFound(_) => 404,
            AccountError::UserBanned(_) => 403,
            AccountError::Store(s) if s.is_conflict() => 409,
            AccountError::Store(_) => 500,
        };
        Self::from_domain(status, e.code(), e.to_string())
    }
}

impl From<InventoryError> for ApiError {
    fn from(e: InventoryError) -> Self {
        let status = match e {
            InventoryError::ProductNotFound(_) => 404,
            InventoryError::OutOfStock(_) => 422,
            InventoryError::NotPooled(_) | InventoryError::InvalidRequest(_) => 400,
            InventoryError::Store(_) => 500,
        };
        Self::from_domain(status, e.code(), e.to_string())
    }
}
