use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum CouponError {
    /// Unknown or expired code
    #[error("Coupon not found or expired: {0}")]
    NotFound(String),

    #[error("Coupon {0} is assigned to another user")]
    NotAssignedToUser(String),

    #[error("Coupon {0} has reached its usage limit")]
    UsageExhausted(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CouponError {
    pub fn code(&self) -> &'static str {
        match self {
            CouponError::NotFound(_) => "COUPON_NOT_FOUND",
            CouponError::NotAssignedToUser(_) => "COUPON_NOT_ASSIGNED",
            CouponError::UsageExhausted(_) => "COUPON_EXHAUSTED",
            CouponError::Store(_) => "INTERNAL_ERROR",
        }
    }

    /// Business rejection (as opposed to an infrastructure fault)
    pub fn is_rejection(&self) -> bool {
        !matches!(self, CouponError::Store(_))
    }
}
