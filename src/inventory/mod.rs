//! Fulfillable inventory: units, seats and the allocation pool

pub mod models;
pub mod pool;

pub use models::{InventoryUnit, NewUnit, PoolStats, UnitCredential, UnitStatus, PENDING_CREDENTIAL};
pub use pool::{Allocation, InventoryError, InventoryPool, PoolPolicy};
