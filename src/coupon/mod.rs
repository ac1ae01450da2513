//! Discount coupons

pub mod engine;
pub mod error;
pub mod models;

pub use engine::CouponEngine;
pub use error::CouponError;
pub use models::{Coupon, Discount, discount_amount};
