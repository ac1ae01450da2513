//! Inventory pool
//!
//! Hands out one seat per purchase for pooled product types. Allocation
//! prefers topping up a partially sold unit over opening a fresh one so the
//! number of distinct shared accounts in circulation stays minimal.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use super::models::{InventoryUnit, NewUnit, PoolStats, UnitCredential, UnitStatus};
use crate::catalog::{Fulfillment, Product};
use crate::store::{Store, StoreError, StoreTx};

/// Re-tries when a locked unit was filled between selection and update
const MAX_ALLOCATE_ATTEMPTS: usize = 3;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("Out of stock: {0}")]
    OutOfStock(String),

    #[error("Product not found: {0}")]
    ProductNotFound(String),

    #[error("Product {0} is not pooled")]
    NotPooled(String),

    #[error("Invalid restock request: {0}")]
    InvalidRequest(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl InventoryError {
    pub fn code(&self) -> &'static str {
        match self {
            InventoryError::OutOfStock(_) => "OUT_OF_STOCK",
            InventoryError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            InventoryError::NotPooled(_) => "NOT_POOLED",
            InventoryError::InvalidRequest(_) => "INVALID_PARAMETER",
            InventoryError::Store(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result of one successful allocation
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// Unit after the seat was taken
    pub unit: InventoryUnit,
    /// True when the unit was opened by this allocation
    pub provisioned: bool,
}

/// Allocation policy knobs
#[derive(Debug, Clone, Copy)]
pub struct PoolPolicy {
    /// Open placeholder units for product types that allow it
    pub lazy_provision: bool,
}

impl Default for PoolPolicy {
    fn default() -> Self {
        Self {
            lazy_provision: true,
        }
    }
}

pub struct InventoryPool {
    store: Arc<dyn Store>,
    policy: PoolPolicy,
}

impl InventoryPool {
    pub fn new(store: Arc<dyn Store>, policy: PoolPolicy) -> Self {
        Self { store, policy }
    }

    /// Take one seat for `product` inside the caller's transaction.
    ///
    /// The caller must abort its transaction on error; nothing here is
    /// visible until it commits.
    ///
    /// The product row is locked first, so allocations for one SKU run one
    /// at a time: a waiter sees the committed seat counts (and any unit the
    /// previous buyer opened) before it searches.
    pub async fn allocate(
        &self,
        tx: &mut dyn StoreTx,
        product: &Product,
    ) -> Result<Allocation, InventoryError> {
        let sku = product.sku.as_str();
        if tx.lock_product(sku).await?.is_none() {
            return Err(InventoryError::ProductNotFound(sku.to_string()));
        }

        for attempt in 1..=MAX_ALLOCATE_ATTEMPTS {
            let (candidate, provisioned) = if let Some(unit) = tx.lock_partial_unit(sku).await? {
                (unit, false)
            } else if let Some(unit) = tx.lock_empty_unit(sku).await? {
                (unit, false)
            } else if self.policy.lazy_provision && product.product_type.allows_lazy_provision() {
                let unit = tx
                    .insert_unit(&NewUnit::placeholder(sku, product.seats_per_unit()))
                    .await?;
                info!(sku = %sku, unit_id = unit.id, max_users = unit.max_users, "Provisioned placeholder unit");
                (unit, true)
            } else {
                return Err(InventoryError::OutOfStock(sku.to_string()));
            };

            if let Some(unit) = tx.occupy_seat(candidate.id).await? {
                debug!(
                    sku = %sku,
                    unit_id = unit.id,
                    current_users = unit.current_users,
                    max_users = unit.max_users,
                    "Seat allocated"
                );
                return Ok(Allocation { unit, provisioned });
            }

            debug!(sku = %sku, unit_id = candidate.id, attempt, "Unit filled concurrently, retrying");
        }

        Err(InventoryError::Store(StoreError::Conflict(format!(
            "seat allocation for {} kept losing races",
            sku
        ))))
    }

    /// Batch-load units with operator-supplied credentials.
    pub async fn restock(
        &self,
        sku: &str,
        credentials: &[UnitCredential],
        max_users: Option<i32>,
    ) -> Result<Vec<InventoryUnit>, InventoryError> {
        if credentials.is_empty() {
            return Err(InventoryError::InvalidRequest("no credentials".into()));
        }
        if let Some(c) = credentials
            .iter()
            .find(|c| c.email.trim().is_empty() || c.password.is_empty())
        {
            return Err(InventoryError::InvalidRequest(format!(
                "empty email or password for '{}'",
                c.email
            )));
        }

        let product = self
            .store
            .product_by_sku(sku)
            .await?
            .ok_or_else(|| InventoryError::ProductNotFound(sku.to_string()))?;
        if product.product_type.fulfillment() != Fulfillment::Pooled {
            return Err(InventoryError::NotPooled(sku.to_string()));
        }
        let seats = max_users.unwrap_or_else(|| product.seats_per_unit());
        if seats < 1 {
            return Err(InventoryError::InvalidRequest(format!(
                "max_users must be >= 1, got {}",
                seats
            )));
        }

        let mut tx = self.store.begin().await?;
        let mut units = Vec::with_capacity(credentials.len());
        for c in credentials {
            let unit = tx
                .insert_unit(&NewUnit {
                    product_sku: sku.to_string(),
                    email: c.email.trim().to_string(),
                    password: c.password.clone(),
                    additional: c.additional.clone(),
                    max_users: seats,
                })
                .await?;
            units.push(unit);
        }
        tx.commit().await?;

        info!(sku = %sku, count = units.len(), max_users = seats, "Inventory restocked");
        Ok(units)
    }

    pub async fn stats(&self, sku: &str) -> Result<PoolStats, InventoryError> {
        let units = self.store.units_by_sku(sku).await?;
        Ok(summarize(&units))
    }
}

fn summarize(units: &[InventoryUnit]) -> PoolStats {
    let mut stats = PoolStats {
        total_units: units.len(),
        ..PoolStats::default()
    };
    for u in units {
        match u.status {
            UnitStatus::Available => stats.available_units += 1,
            UnitStatus::Filled => stats.filled_units += 1,
            UnitStatus::Expired => stats.expired_units += 1,
        }
        stats.sold_seats += i64::from(u.current_users);
        stats.free_seats += i64::from(u.free_seats());
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductType;
    use crate::store::MemoryStore;
    use rust_decimal_macros::dec;

    fn product(sku: &str, ty: ProductType, capacity: i32) -> Product {
        Product {
            id: 0,
            sku: sku.into(),
            category: "chatgpt".into(),
            title: sku.into(),
            description: String::new(),
            price: dec!(80000),
            product_type: ty,
            capacity,
            is_active: true,
            display_order: 0,
        }
    }

    async fn setup(ty: ProductType, capacity: i32) -> (MemoryStore, InventoryPool, Product) {
        let store = MemoryStore::new();
        let p = store
            .seed_product(product("gpt_shared_3", ty, capacity))
            .await
            .unwrap();
        let pool = InventoryPool::new(Arc::new(store.clone()), PoolPolicy::default());
        (store, pool, p)
    }

    #[tokio::test]
    async fn test_allocate_requires_product_row() {
        let (store, pool, _) = setup(ProductType::Shared, 3).await;
        let ghost = product("gpt_ghost", ProductType::Shared, 3);

        let mut tx = store.begin().await.unwrap();
        let err = pool.allocate(tx.as_mut(), &ghost).await.unwrap_err();
        assert!(matches!(err, InventoryError::ProductNotFound(sku) if sku == "gpt_ghost"));
        drop(tx);
        assert!(store.units_by_sku("gpt_ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fills_partial_unit_before_opening_new() {
        let (store, pool, p) = setup(ProductType::Shared, 3).await;

        let mut tx = store.begin().await.unwrap();
        let first = pool.allocate(tx.as_mut(), &p).await.unwrap();
        assert!(first.provisioned);
        let second = pool.allocate(tx.as_mut(), &p).await.unwrap();
        assert!(!second.provisioned);
        assert_eq!(first.unit.id, second.unit.id);
        assert_eq!(second.unit.current_users, 2);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_prefers_partial_over_empty_stock() {
        let (store, pool, p) = setup(ProductType::Shared, 2).await;
        let cred = |e: &str| UnitCredential {
            email: e.into(),
            password: "pw".into(),
            additional: String::new(),
        };
        let units = pool
            .restock(&p.sku, &[cred("a@x.io"), cred("b@x.io")], None)
            .await
            .unwrap();

        let mut tx = store.begin().await.unwrap();
        // Put one buyer in the second unit
        tx.occupy_seat(units[1].id).await.unwrap();
        let alloc = pool.allocate(tx.as_mut(), &p).await.unwrap();
        assert_eq!(alloc.unit.id, units[1].id);
        assert_eq!(alloc.unit.status, UnitStatus::Filled);
    }

    #[tokio::test]
    async fn test_ready_made_out_of_stock() {
        let (store, pool, p) = setup(ProductType::ReadyMade, 1).await;
        let mut tx = store.begin().await.unwrap();
        let err = pool.allocate(tx.as_mut(), &p).await.unwrap_err();
        assert!(matches!(err, InventoryError::OutOfStock(_)));
    }

    #[tokio::test]
    async fn test_lazy_provision_disabled() {
        let store = MemoryStore::new();
        let p = store
            .seed_product(product("gpt_shared_3", ProductType::Shared, 3))
            .await
            .unwrap();
        let pool = InventoryPool::new(
            Arc::new(store.clone()),
            PoolPolicy {
                lazy_provision: false,
            },
        );
        let mut tx = store.begin().await.unwrap();
        let err = pool.allocate(tx.as_mut(), &p).await.unwrap_err();
        assert_eq!(err.code(), "OUT_OF_STOCK");
    }

    #[tokio::test]
    async fn test_restock_rejects_unknown_and_non_pooled() {
        let (store, pool, _) = setup(ProductType::Shared, 3).await;
        store
            .seed_product(product("manual_x", ProductType::ManualOrder, 1))
            .await
            .unwrap();
        let cred = [UnitCredential {
            email: "a@x.io".into(),
            password: "pw".into(),
            additional: String::new(),
        }];

        assert!(matches!(
            pool.restock("nope", &cred, None).await,
            Err(InventoryError::ProductNotFound(_))
        ));
        assert!(matches!(
            pool.restock("manual_x", &cred, None).await,
            Err(InventoryError::NotPooled(_))
        ));
        assert!(matches!(
            pool.restock("gpt_shared_3", &[], None).await,
            Err(InventoryError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_stats() {
        let (store, pool, p) = setup(ProductType::Shared, 2).await;
        let mut tx = store.begin().await.unwrap();
        for _ in 0..3 {
            pool.allocate(tx.as_mut(), &p).await.unwrap();
        }
        tx.commit().await.unwrap();

        let stats = pool.stats(&p.sku).await.unwrap();
        assert_eq!(stats.total_units, 2);
        assert_eq!(stats.filled_units, 1);
        assert_eq!(stats.available_units, 1);
        assert_eq!(stats.sold_seats, 3);
        assert_eq!(stats.free_seats, 1);
    }
}
