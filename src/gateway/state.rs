use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::account::UserService;
use crate::card_issuer::CardIssuer;
use crate::config::AppConfig;
use crate::coupon::CouponEngine;
use crate::inventory::{InventoryPool, PoolPolicy};
use crate::order::{CardSettings, OrderLedger, PurchaseOrchestrator};
use crate::payment::{PaymentGateway, PaymentService};
use crate::store::Store;

/// Gateway application state (shared)
#[derive(Clone)]
pub struct AppState {
    /// Backing store (health checks)
    pub store: Arc<dyn Store>,
    pub users: Arc<UserService>,
    pub coupons: Arc<CouponEngine>,
    pub pool: Arc<InventoryPool>,
    pub orders: Arc<PurchaseOrchestrator>,
    pub ledger: Arc<OrderLedger>,
    pub payments: Arc<PaymentService>,
    started_at: Instant,
}

impl AppState {
    /// Wire every service onto one store and the two external providers.
    pub fn build(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        card_issuer: Arc<dyn CardIssuer>,
        config: &AppConfig,
    ) -> Self {
        let pool = Arc::new(InventoryPool::new(
            store.clone(),
            PoolPolicy {
                lazy_provision: config.inventory.lazy_provision_shared,
            },
        ));
        let coupons = Arc::new(CouponEngine::new(store.clone()));
        let orders = Arc::new(PurchaseOrchestrator::new(
            store.clone(),
            pool.clone(),
            coupons.clone(),
            card_issuer,
            CardSettings::from(&config.card_issuer),
        ));
        let payments = Arc::new(PaymentService::new(
            store.clone(),
            gateway,
            config.payment_gateway.callback_url.clone(),
            Duration::from_millis(config.payment_gateway.timeout_ms),
        ));

        Self {
            users: Arc::new(UserService::new(store.clone())),
            ledger: Arc::new(OrderLedger::new(store.clone())),
            store,
            coupons,
            pool,
            orders,
            payments,
            started_at: Instant::now(),
        }
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}
