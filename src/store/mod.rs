//! Transactional store
//!
//! All coordination between concurrent purchases and payments happens here,
//! never in process memory. A [`StoreTx`] holds row locks from the moment a
//! `lock_*` call returns until `commit` (or drop, which rolls back).
//!
//! Lock order inside one transaction is always
//! user → coupon → order/payment → inventory unit.

pub mod error;
pub mod memory;
pub mod postgres;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::account::{NewUser, User};
use crate::catalog::Product;
use crate::core_types::{CouponId, OrderId, PaymentId, UnitId, UserId};
use crate::coupon::Coupon;
use crate::inventory::{InventoryUnit, NewUnit};
use crate::order::{NewOrder, Order, OrderStatus, PaymentMethod};
use crate::payment::{NewPayment, Payment, PaymentStatus};

/// Non-locking reads and transaction entry point
#[async_trait]
pub trait Store: Send + Sync {
    /// Open a transaction.
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;

    /// Connectivity check for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>, StoreError>;

    async fn product_by_sku(&self, sku: &str) -> Result<Option<Product>, StoreError>;

    /// Unexpired coupon by code.
    async fn coupon_by_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Coupon>, StoreError>;

    /// Unexpired coupons that are public or assigned to `user_id`.
    async fn coupons_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Coupon>, StoreError>;

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// All orders, newest first.
    async fn orders(&self, limit: i64, offset: i64) -> Result<Vec<Order>, StoreError>;

    /// One user's orders, newest first.
    async fn orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError>;

    async fn payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError>;

    async fn payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, StoreError>;

    /// Payments in one of `statuses` last touched before `older_than`,
    /// oldest first.
    async fn stale_payments(
        &self,
        statuses: &[PaymentStatus],
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Payment>, StoreError>;

    async fn units_by_sku(&self, sku: &str) -> Result<Vec<InventoryUnit>, StoreError>;
}

/// One open transaction
///
/// `lock_*` methods take a row-level write lock (`SELECT … FOR UPDATE`).
/// Conditional writes return `false` when their guard did not match and
/// change nothing.
#[async_trait]
pub trait StoreTx: Send {
    // --- users ---

    async fn lock_user(&mut self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn user_by_telegram_id(&mut self, telegram_id: i64) -> Result<Option<User>, StoreError>;

    async fn user_by_referral_code(&mut self, code: &str) -> Result<Option<User>, StoreError>;

    /// Fails with `Conflict` on a duplicate telegram id or referral code.
    async fn insert_user(&mut self, new: &NewUser) -> Result<User, StoreError>;

    async fn increment_referrals(&mut self, id: UserId) -> Result<(), StoreError>;

    /// `wallet_balance -= amount, total_spent += amount`
    /// only if `wallet_balance >= amount`.
    async fn debit_wallet(&mut self, id: UserId, amount: Decimal) -> Result<bool, StoreError>;

    async fn credit_wallet(&mut self, id: UserId, amount: Decimal) -> Result<(), StoreError>;

    /// `total_spent += amount` for money that did not pass through the wallet.
    async fn record_spend(&mut self, id: UserId, amount: Decimal) -> Result<(), StoreError>;

    // --- catalog / inventory ---

    async fn product_by_sku(&mut self, sku: &str) -> Result<Option<Product>, StoreError>;

    /// Row-locks the product. Held until commit; serialises allocation per SKU.
    async fn lock_product(&mut self, sku: &str) -> Result<Option<Product>, StoreError>;

    /// Lowest-id AVAILABLE unit with `0 < current_users < max_users`.
    async fn lock_partial_unit(&mut self, sku: &str) -> Result<Option<InventoryUnit>, StoreError>;

    /// Lowest-id AVAILABLE unit with `current_users = 0`.
    async fn lock_empty_unit(&mut self, sku: &str) -> Result<Option<InventoryUnit>, StoreError>;

    async fn insert_unit(&mut self, new: &NewUnit) -> Result<InventoryUnit, StoreError>;

    /// `current_users += 1` (and FILLED at capacity) only if the unit is
    /// AVAILABLE with a free seat. Returns the updated unit.
    async fn occupy_seat(&mut self, id: UnitId) -> Result<Option<InventoryUnit>, StoreError>;

    // --- coupons ---

    /// Coupon by code regardless of expiry; the caller decides.
    async fn lock_coupon(&mut self, code: &str) -> Result<Option<Coupon>, StoreError>;

    /// `used_count += 1` only if below a positive `usage_limit` (or unlimited).
    async fn increment_coupon_usage(&mut self, id: CouponId) -> Result<bool, StoreError>;

    // --- orders ---

    /// Fails with `Conflict` on a duplicate order number.
    async fn insert_order(&mut self, new: &NewOrder) -> Result<Order, StoreError>;

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// CAS on status. Sets `payment_method` when given and `delivered_at`
    /// when advancing to COMPLETED.
    async fn advance_order(
        &mut self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        method: Option<PaymentMethod>,
    ) -> Result<bool, StoreError>;

    // --- payments ---

    /// Fails with `Conflict` on a duplicate transaction id.
    async fn insert_payment(&mut self, new: &NewPayment) -> Result<Payment, StoreError>;

    async fn lock_payment(&mut self, id: PaymentId) -> Result<Option<Payment>, StoreError>;

    /// CAS: write `payment`'s mutable fields only if the stored status is
    /// still `expected`.
    async fn update_payment_if(
        &mut self,
        payment: &Payment,
        expected: PaymentStatus,
    ) -> Result<bool, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
