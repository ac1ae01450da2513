//! Orders: records, the purchase transaction and ledger reads

pub mod error;
pub mod ledger;
pub mod models;
pub mod orchestrator;

pub use error::PurchaseError;
pub use ledger::OrderLedger;
pub use models::{NewOrder, Order, OrderStatus, PaymentMethod, new_order_number};
pub use orchestrator::{CardSettings, OrderResult, PurchaseOrchestrator};
