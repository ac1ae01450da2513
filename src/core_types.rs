//! Core types used throughout the system
//!
//! These are fundamental type aliases used by all modules.
//! They map 1:1 onto the `BIGINT` primary keys of the PostgreSQL schema.

/// User ID - internal primary key, assigned on first contact.
///
/// Not to be confused with the chat platform id (`telegram_id`), which is
/// only used to find or register a user.
pub type UserId = i64;

/// Product ID - catalog primary key (the business key is the SKU)
pub type ProductId = i64;

/// Inventory unit ID - one fulfillable account in the pool
pub type UnitId = i64;

/// Order ID - unique within the system
pub type OrderId = i64;

/// Payment ID - unique within the system
pub type PaymentId = i64;

/// Coupon ID - unique within the system
pub type CouponId = i64;
