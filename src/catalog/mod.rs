//! Product catalog
//!
//! Read-only to the core: products are created and edited by admin tooling.
//! The core only looks products up by SKU and dispatches on [`ProductType`].

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::ProductId;

/// Product type - selects how a purchase is fulfilled
///
/// Stored as a short string in `products.product_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    /// Seat in an account shared by up to `capacity` buyers
    Shared,
    /// Pre-made single account from the pool
    ReadyMade,
    /// Private account paid for with a freshly issued virtual card
    PrivateLegal,
    /// Private invite paid for with a freshly issued virtual card
    PrivateInvite,
    /// Fulfilled by a human after payment
    ManualOrder,
}

/// Fulfillment strategy for a product type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fulfillment {
    /// Take a seat from the inventory pool
    Pooled,
    /// Mint a funding card through the card issuer
    IssuedCard,
    /// No allocation, order waits for an operator
    Manual,
}

impl ProductType {
    /// Fulfillment strategy for this type.
    pub fn fulfillment(&self) -> Fulfillment {
        match self {
            ProductType::Shared | ProductType::ReadyMade => Fulfillment::Pooled,
            ProductType::PrivateLegal | ProductType::PrivateInvite => Fulfillment::IssuedCard,
            ProductType::ManualOrder => Fulfillment::Manual,
        }
    }

    /// Whether the pool may open a placeholder unit when no seat is free.
    ///
    /// Only shared groups are provisioned on demand; a ready-made account
    /// must exist before it can be sold.
    pub fn allows_lazy_provision(&self) -> bool {
        matches!(self, ProductType::Shared)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Shared => "shared",
            ProductType::ReadyMade => "ready_made",
            ProductType::PrivateLegal => "private_legal",
            ProductType::PrivateInvite => "private_invite",
            ProductType::ManualOrder => "manual_order",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "shared" => Ok(ProductType::Shared),
            "ready_made" => Ok(ProductType::ReadyMade),
            "private_legal" => Ok(ProductType::PrivateLegal),
            "private_invite" => Ok(ProductType::PrivateInvite),
            "manual_order" => Ok(ProductType::ManualOrder),
            _ => Err(format!("Invalid product type: {}", s)),
        }
    }
}

/// Catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Unique business key, e.g. `gpt_shared_4`
    pub sku: String,
    /// chatgpt, gemini, claude, tools
    pub category: String,
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub product_type: ProductType,
    /// Seats per shared unit (>= 1)
    pub capacity: i32,
    pub is_active: bool,
    pub display_order: i32,
}

impl Product {
    /// Seats per unit, never below one.
    pub fn seats_per_unit(&self) -> i32 {
        self.capacity.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_type_roundtrip() {
        for ty in [
            ProductType::Shared,
            ProductType::ReadyMade,
            ProductType::PrivateLegal,
            ProductType::PrivateInvite,
            ProductType::ManualOrder,
        ] {
            assert_eq!(ty.as_str().parse::<ProductType>().unwrap(), ty);
        }
        assert!("family_plan".parse::<ProductType>().is_err());
    }

    #[test]
    fn test_fulfillment_dispatch() {
        assert_eq!(ProductType::Shared.fulfillment(), Fulfillment::Pooled);
        assert_eq!(ProductType::ReadyMade.fulfillment(), Fulfillment::Pooled);
        assert_eq!(
            ProductType::PrivateInvite.fulfillment(),
            Fulfillment::IssuedCard
        );
        assert_eq!(ProductType::ManualOrder.fulfillment(), Fulfillment::Manual);

        assert!(ProductType::Shared.allows_lazy_provision());
        assert!(!ProductType::ReadyMade.allows_lazy_provision());
    }
}
