//! Shared fixtures for integration tests: an in-memory shop wired the same
//! way the binary wires it, with mock providers.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;

use permia_core::card_issuer::mock::MockCardIssuer;
use permia_core::config::AppConfig;
use permia_core::coupon::Coupon;
use permia_core::gateway::AppState;
use permia_core::payment::gateway::mock::MockGateway;
use permia_core::{MemoryStore, Product, ProductType, Store, User, UserId};

const TEST_CONFIG: &str = r#"
log_level: debug
log_dir: ./logs
log_file: test.log
use_json: false
rotation: never
gateway:
  host: 127.0.0.1
  port: 0
payment_gateway:
  callback_url: http://localhost/api/v1/payments/callback
  timeout_ms: 300
  sandbox: true
card_issuer:
  sandbox: true
"#;

pub struct Shop {
    pub store: MemoryStore,
    pub gateway: Arc<MockGateway>,
    pub issuer: Arc<MockCardIssuer>,
    pub state: Arc<AppState>,
    pub config: AppConfig,
}

pub fn config() -> AppConfig {
    AppConfig::from_yaml(TEST_CONFIG).expect("test config")
}

pub fn shop() -> Shop {
    let config = config();
    let store = MemoryStore::new();
    let gateway = Arc::new(MockGateway::new());
    let issuer = Arc::new(MockCardIssuer::new());
    let state = Arc::new(AppState::build(
        Arc::new(store.clone()),
        gateway.clone(),
        issuer.clone(),
        &config,
    ));
    Shop {
        store,
        gateway,
        issuer,
        state,
        config,
    }
}

impl Shop {
    pub async fn product(&self, sku: &str, ty: ProductType, price: Decimal, capacity: i32) -> Product {
        self.store
            .seed_product(Product {
                id: 0,
                sku: sku.to_string(),
                category: "chatgpt".to_string(),
                title: sku.to_string(),
                description: String::new(),
                price,
                product_type: ty,
                capacity,
                is_active: true,
                display_order: 0,
            })
            .await
            .expect("seed product")
    }

    pub async fn coupon(&self, code: &str, percent: Decimal, max_discount: Decimal, usage_limit: i32) -> Coupon {
        self.store
            .seed_coupon(Coupon {
                id: 0,
                code: code.to_string(),
                percent,
                max_discount,
                usage_limit,
                used_count: 0,
                expires_at: None,
                assignee_id: None,
                created_at: Utc::now(),
            })
            .await
            .expect("seed coupon")
    }

    pub async fn user(&self, telegram_id: i64, balance: Decimal) -> User {
        self.store
            .seed_user(telegram_id, balance)
            .await
            .expect("seed user")
    }

    pub async fn balance(&self, user_id: UserId) -> Decimal {
        self.store
            .user(user_id)
            .await
            .expect("store read")
            .expect("user exists")
            .wallet_balance
    }

    pub async fn seats_sold(&self, sku: &str) -> i32 {
        self.store
            .units_by_sku(sku)
            .await
            .expect("store read")
            .iter()
            .map(|u| u.current_users)
            .sum()
    }
}
