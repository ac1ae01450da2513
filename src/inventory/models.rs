//! Inventory unit models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core_types::UnitId;

/// Credential placeholder for units opened before an operator fills them in
pub const PENDING_CREDENTIAL: &str = "Pending";

/// Unit status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    /// Has at least one free seat
    Available,
    /// `current_users == max_users`
    Filled,
    /// Withdrawn from sale
    Expired,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Available => "AVAILABLE",
            UnitStatus::Filled => "FILLED",
            UnitStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(UnitStatus::Available),
            "FILLED" => Ok(UnitStatus::Filled),
            "EXPIRED" => Ok(UnitStatus::Expired),
            _ => Err(format!("Invalid unit status: {}", s)),
        }
    }
}

/// One fulfillable account for a SKU, shared by up to `max_users` buyers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryUnit {
    pub id: UnitId,
    pub product_sku: String,
    pub email: String,
    /// Stored encrypted by the admin tooling; opaque here
    pub password: String,
    /// Extra delivery data (tokens, invite links) as JSON text
    pub additional: String,
    pub max_users: i32,
    pub current_users: i32,
    pub status: UnitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryUnit {
    pub fn free_seats(&self) -> i32 {
        match self.status {
            UnitStatus::Expired => 0,
            _ => (self.max_users - self.current_users).max(0),
        }
    }

    /// True when no operator has supplied credentials yet.
    pub fn is_placeholder(&self) -> bool {
        self.email == PENDING_CREDENTIAL
    }

    /// Apply one seat in place.
    ///
    /// Returns `false` (and changes nothing) when the unit is not
    /// `AVAILABLE` or already full.
    pub fn take_seat(&mut self) -> bool {
        if self.status != UnitStatus::Available || self.current_users >= self.max_users {
            return false;
        }
        self.current_users += 1;
        if self.current_users == self.max_users {
            self.status = UnitStatus::Filled;
        }
        true
    }
}

/// Insert payload for a unit (admin batch load or lazy provisioning)
#[derive(Debug, Clone, PartialEq)]
pub struct NewUnit {
    pub product_sku: String,
    pub email: String,
    pub password: String,
    pub additional: String,
    pub max_users: i32,
}

impl NewUnit {
    /// Empty group opened on demand; credentials follow from an operator.
    pub fn placeholder(sku: &str, max_users: i32) -> Self {
        Self {
            product_sku: sku.to_string(),
            email: PENDING_CREDENTIAL.to_string(),
            password: PENDING_CREDENTIAL.to_string(),
            additional: String::new(),
            max_users: max_users.max(1),
        }
    }
}

/// Credentials for a restock batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCredential {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub additional: String,
}

/// Pool summary for one SKU
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub total_units: usize,
    pub available_units: usize,
    pub filled_units: usize,
    pub expired_units: usize,
    pub sold_seats: i64,
    pub free_seats: i64,
}
