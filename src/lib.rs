//! permia-core - Wallet-backed digital goods shop core
//!
//! Sells AI-service accounts through a chat front-end. The core is the
//! purchase transaction (funds check, coupon, seat allocation, debit, order)
//! and the gateway top-up state machine (charge → verify).
//!
//! # Modules
//!
//! - [`core_types`] - Id aliases (UserId, OrderId, etc.)
//! - [`money`] - Amount parsing, validation and gateway conversion
//! - [`catalog`] - Products and per-type fulfillment strategy
//! - [`account`] - Users, wallet, registration
//! - [`inventory`] - Shared account pool and seat allocation
//! - [`coupon`] - Discount codes
//! - [`order`] - Purchase orchestration and order ledger
//! - [`payment`] - Payment FSM, gateway adapters, recovery worker
//! - [`card_issuer`] - Virtual card provider
//! - [`store`] - Transactional store (PostgreSQL / in-memory)
//! - [`gateway`] - HTTP surface

// Core types - must be first!
pub mod core_types;
pub mod money;

// Domain
pub mod account;
pub mod catalog;
pub mod coupon;
pub mod inventory;
pub mod order;
pub mod payment;

// External providers
pub mod card_issuer;

// Persistence
pub mod db;
pub mod store;

// Service
pub mod config;
pub mod gateway;
pub mod logging;

// Convenient re-exports at crate root
pub use account::{User, UserService, WalletAccount};
pub use catalog::{Fulfillment, Product, ProductType};
pub use core_types::{CouponId, OrderId, PaymentId, ProductId, UnitId, UserId};
pub use coupon::{CouponEngine, CouponError};
pub use inventory::{InventoryPool, PoolPolicy};
pub use order::{OrderLedger, OrderResult, OrderStatus, PurchaseError, PurchaseOrchestrator};
pub use payment::{PaymentError, PaymentService, PaymentStatus};
pub use store::{MemoryStore, PgStore, Store, StoreError};
