//! Order records and status

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::{CouponId, OrderId, ProductId, UnitId, UserId};

/// Order status
///
/// Stored as SMALLINT. Status only moves forward; terminal orders are
/// never reopened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(i16)]
pub enum OrderStatus {
    /// Created, not yet paid
    Pending = 0,
    /// Paid, waiting for fulfilment
    Paid = 10,
    /// Terminal: delivered
    Completed = 20,
    /// Terminal: payment or fulfilment failed
    Failed = -10,
    /// Terminal: abandoned by user or operator
    Cancelled = -20,
}

impl OrderStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }

    /// Forward-only transition table.
    pub fn can_advance_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Pending, OrderStatus::Failed)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Paid, OrderStatus::Completed)
                | (OrderStatus::Paid, OrderStatus::Cancelled)
        )
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(OrderStatus::Pending),
            10 => Some(OrderStatus::Paid),
            20 => Some(OrderStatus::Completed),
            -10 => Some(OrderStatus::Failed),
            -20 => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Failed => "FAILED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How money was (or will be) collected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Debit the store wallet directly
    Wallet,
    /// External gateway round-trip
    Card,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Card => "card",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "wallet" => Ok(PaymentMethod::Wallet),
            "card" | "zarinpal" | "gateway" => Ok(PaymentMethod::Card),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

/// Durable record of one purchase attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub user_id: UserId,
    pub product_id: ProductId,
    /// Inventory unit granted (pooled types only)
    pub account_id: Option<UnitId>,
    /// Price actually charged, after discount
    pub amount: Decimal,
    pub coupon_id: Option<CouponId>,
    pub status: OrderStatus,
    /// `None` until the order has been paid
    pub payment_method: Option<PaymentMethod>,
    /// Text shown to the buyer
    pub delivered_data: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

/// Insert payload for an order
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub account_id: Option<UnitId>,
    pub amount: Decimal,
    pub coupon_id: Option<CouponId>,
    pub status: OrderStatus,
    pub payment_method: Option<PaymentMethod>,
    pub delivered_data: String,
}

/// Generate a unique order number: `ORD-{user}-{unix secs}-{suffix}`.
///
/// The random suffix keeps numbers distinct for concurrent orders placed by
/// the same user within one second.
pub fn new_order_number(user_id: UserId, now: DateTime<Utc>) -> String {
    let ulid = ulid::Ulid::new().to_string();
    let suffix = &ulid[ulid.len() - 6..];
    format!("ORD-{}-{}-{}", user_id, now.timestamp(), suffix)
}
