//! HTTP handlers
//!
//! Handlers only decode the request, call one service operation and wrap
//! the result. All rules live in the services.

pub mod coupons;
pub mod health;
pub mod orders;
pub mod payments;
pub mod users;
