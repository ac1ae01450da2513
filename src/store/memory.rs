//! In-process store
//!
//! Every transaction takes the single table lock for its whole lifetime and
//! works on a staged copy, so transactions are fully serialised and a
//! dropped transaction leaves no trace. Used for development runs without
//! PostgreSQL and for the test suite.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Store, StoreError, StoreTx};
use crate::account::{NewUser, User};
use crate::catalog::Product;
use crate::core_types::{CouponId, OrderId, PaymentId, ProductId, UnitId, UserId};
use crate::coupon::Coupon;
use crate::inventory::{InventoryUnit, NewUnit, UnitStatus};
use crate::order::{NewOrder, Order, OrderStatus, PaymentMethod};
use crate::payment::{NewPayment, Payment, PaymentStatus};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    products: BTreeMap<ProductId, Product>,
    units: BTreeMap<UnitId, InventoryUnit>,
    coupons: BTreeMap<CouponId, Coupon>,
    orders: BTreeMap<OrderId, Order>,
    payments: BTreeMap<PaymentId, Payment>,
    seq: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    fn coupon_by_code(&self, code: &str) -> Option<&Coupon> {
        self.coupons.values().find(|c| c.code == code)
    }

    fn product_by_sku(&self, sku: &str) -> Option<&Product> {
        self.products.values().find(|p| p.sku == sku)
    }

    fn first_unit(&self, sku: &str, pred: impl Fn(&InventoryUnit) -> bool) -> Option<InventoryUnit> {
        self.units
            .values()
            .find(|u| u.product_sku == sku && u.status == UnitStatus::Available && pred(u))
            .cloned()
    }
}

/// Serialisable in-memory backend
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a catalog entry (admin tooling stand-in). The id is assigned here.
    pub async fn seed_product(&self, mut product: Product) -> Result<Product, StoreError> {
        let mut t = self.tables.lock().await;
        if t.product_by_sku(&product.sku).is_some() {
            return Err(StoreError::Conflict(format!("duplicate sku {}", product.sku)));
        }
        product.id = t.next_id();
        t.products.insert(product.id, product.clone());
        Ok(product)
    }

    /// Add a coupon (admin tooling stand-in). The id is assigned here.
    pub async fn seed_coupon(&self, mut coupon: Coupon) -> Result<Coupon, StoreError> {
        let mut t = self.tables.lock().await;
        if t.coupon_by_code(&coupon.code).is_some() {
            return Err(StoreError::Conflict(format!("duplicate coupon {}", coupon.code)));
        }
        coupon.id = t.next_id();
        t.coupons.insert(coupon.id, coupon.clone());
        Ok(coupon)
    }

    /// Register a user with an opening balance (fixture).
    pub async fn seed_user(&self, telegram_id: i64, balance: Decimal) -> Result<User, StoreError> {
        let mut tx = self.begin().await?;
        let user = tx
            .insert_user(&NewUser {
                telegram_id,
                profile: Default::default(),
                referral_code: format!("R{:07}", telegram_id),
                referred_by: None,
            })
            .await?;
        tx.credit_wallet(user.id, balance).await?;
        let user = tx.lock_user(user.id).await?.unwrap_or(user);
        tx.commit().await?;
        Ok(user)
    }

    /// Flip the ban flag (fixture).
    pub async fn set_banned(&self, user_id: UserId, banned: bool) {
        let mut t = self.tables.lock().await;
        if let Some(user) = t.users.get_mut(&user_id) {
            user.is_banned = banned;
        }
    }

    /// Overwrite a payment row as-is (fixture for aged rows).
    pub async fn put_payment(&self, payment: Payment) {
        let mut t = self.tables.lock().await;
        t.payments.insert(payment.id, payment);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn user_by_telegram_id(&self, telegram_id: i64) -> Result<Option<User>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.users.values().find(|u| u.telegram_id == telegram_id).cloned())
    }

    async fn product_by_sku(&self, sku: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.lock().await.product_by_sku(sku).cloned())
    }

    async fn coupon_by_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Coupon>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.coupon_by_code(code).filter(|c| !c.is_expired(now)).cloned())
    }

    async fn coupons_for_user(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Coupon>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.coupons
            .values()
            .filter(|c| !c.is_expired(now))
            .filter(|c| c.assignee_id.is_none_or(|a| a == user_id))
            .cloned()
            .collect())
    }

    async fn order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.tables.lock().await.orders.get(&id).cloned())
    }

    async fn orders(&self, limit: i64, offset: i64) -> Result<Vec<Order>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.orders
            .values()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn orders_by_user(&self, user_id: UserId) -> Result<Vec<Order>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.orders
            .values()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn payment(&self, id: PaymentId) -> Result<Option<Payment>, StoreError> {
        Ok(self.tables.lock().await.payments.get(&id).cloned())
    }

    async fn payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.payments
            .values()
            .find(|p| p.transaction_id == transaction_id)
            .cloned())
    }

    async fn stale_payments(
        &self,
        statuses: &[PaymentStatus],
        older_than: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Payment>, StoreError> {
        let t = self.tables.lock().await;
        let mut stale: Vec<Payment> = t
            .payments
            .values()
            .filter(|p| statuses.contains(&p.status) && p.updated_at < older_than)
            .cloned()
            .collect();
        stale.sort_by_key(|p| (p.updated_at, p.id));
        stale.truncate(limit.max(0) as usize);
        Ok(stale)
    }

    async fn units_by_sku(&self, sku: &str) -> Result<Vec<InventoryUnit>, StoreError> {
        let t = self.tables.lock().await;
        Ok(t.units
            .values()
            .filter(|u| u.product_sku == sku)
            .cloned()
            .collect())
    }
}

/// Open transaction: holds the table lock, mutates a staged copy
struct MemoryTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

fn missing(what: &str, id: i64) -> StoreError {
    StoreError::Corrupt(format!("{} {} does not exist", what, id))
}

#[async_trait]
impl StoreTx for MemoryTx {
    async fn lock_user(&mut self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn user_by_telegram_id(&mut self, telegram_id: i64) -> Result<Option<User>, StoreError> {
        Ok(self
            .staged
            .users
            .values()
            .find(|u| u.telegram_id == telegram_id)
            .cloned())
    }

    async fn user_by_referral_code(&mut self, code: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .staged
            .users
            .values()
            .find(|u| u.referral_code == code)
            .cloned())
    }

    async fn insert_user(&mut self, new: &NewUser) -> Result<User, StoreError> {
        let t = &mut self.staged;
        if t.users.values().any(|u| u.telegram_id == new.telegram_id) {
            return Err(StoreError::Conflict(format!(
                "duplicate telegram_id {}",
                new.telegram_id
            )));
        }
        if t.users.values().any(|u| u.referral_code == new.referral_code) {
            return Err(StoreError::Conflict(format!(
                "duplicate referral_code {}",
                new.referral_code
            )));
        }
        let user = User {
            id: t.next_id(),
            telegram_id: new.telegram_id,
            username: new.profile.username.clone(),
            first_name: new.profile.first_name.clone(),
            last_name: new.profile.last_name.clone(),
            wallet_balance: Decimal::ZERO,
            total_spent: Decimal::ZERO,
            referral_code: new.referral_code.clone(),
            referred_by: new.referred_by,
            total_referrals: 0,
            is_banned: false,
            created_at: Utc::now(),
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn increment_referrals(&mut self, id: UserId) -> Result<(), StoreError> {
        let user = self.staged.users.get_mut(&id).ok_or_else(|| missing("user", id))?;
        user.total_referrals += 1;
        Ok(())
    }

    async fn debit_wallet(&mut self, id: UserId, amount: Decimal) -> Result<bool, StoreError> {
        let user = self.staged.users.get_mut(&id).ok_or_else(|| missing("user", id))?;
        if user.wallet_balance < amount {
            return Ok(false);
        }
        user.wallet_balance -= amount;
        user.total_spent += amount;
        Ok(true)
    }

    async fn credit_wallet(&mut self, id: UserId, amount: Decimal) -> Result<(), StoreError> {
        let user = self.staged.users.get_mut(&id).ok_or_else(|| missing("user", id))?;
        user.wallet_balance += amount;
        Ok(())
    }

    async fn record_spend(&mut self, id: UserId, amount: Decimal) -> Result<(), StoreError> {
        let user = self.staged.users.get_mut(&id).ok_or_else(|| missing("user", id))?;
        user.total_spent += amount;
        Ok(())
    }

    async fn product_by_sku(&mut self, sku: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.staged.product_by_sku(sku).cloned())
    }

    // Every transaction already holds the table lock.
    async fn lock_product(&mut self, sku: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.staged.product_by_sku(sku).cloned())
    }

    async fn lock_partial_unit(&mut self, sku: &str) -> Result<Option<InventoryUnit>, StoreError> {
        Ok(self
            .staged
            .first_unit(sku, |u| u.current_users > 0 && u.current_users < u.max_users))
    }

    async fn lock_empty_unit(&mut self, sku: &str) -> Result<Option<InventoryUnit>, StoreError> {
        Ok(self.staged.first_unit(sku, |u| u.current_users == 0))
    }

    async fn insert_unit(&mut self, new: &NewUnit) -> Result<InventoryUnit, StoreError> {
        let t = &mut self.staged;
        let now = Utc::now();
        let unit = InventoryUnit {
            id: t.next_id(),
            product_sku: new.product_sku.clone(),
            email: new.email.clone(),
            password: new.password.clone(),
            additional: new.additional.clone(),
            max_users: new.max_users,
            current_users: 0,
            status: UnitStatus::Available,
            created_at: now,
            updated_at: now,
        };
        t.units.insert(unit.id, unit.clone());
        Ok(unit)
    }

    async fn occupy_seat(&mut self, id: UnitId) -> Result<Option<InventoryUnit>, StoreError> {
        let Some(unit) = self.staged.units.get_mut(&id) else {
            return Ok(None);
        };
        if !unit.take_seat() {
            return Ok(None);
        }
        unit.updated_at = Utc::now();
        Ok(Some(unit.clone()))
    }

    async fn lock_coupon(&mut self, code: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(self.staged.coupon_by_code(code).cloned())
    }

    async fn increment_coupon_usage(&mut self, id: CouponId) -> Result<bool, StoreError> {
        let Some(coupon) = self.staged.coupons.get_mut(&id) else {
            return Ok(false);
        };
        if coupon.is_exhausted() {
            return Ok(false);
        }
        coupon.used_count += 1;
        Ok(true)
    }

    async fn insert_order(&mut self, new: &NewOrder) -> Result<Order, StoreError> {
        let t = &mut self.staged;
        if t.orders.values().any(|o| o.order_number == new.order_number) {
            return Err(StoreError::Conflict(format!(
                "duplicate order_number {}",
                new.order_number
            )));
        }
        let now = Utc::now();
        let order = Order {
            id: t.next_id(),
            order_number: new.order_number.clone(),
            user_id: new.user_id,
            product_id: new.product_id,
            account_id: new.account_id,
            amount: new.amount,
            coupon_id: new.coupon_id,
            status: new.status,
            payment_method: new.payment_method,
            delivered_data: new.delivered_data.clone(),
            created_at: now,
            updated_at: now,
            delivered_at: (new.status == OrderStatus::Completed).then_some(now),
        };
        t.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.staged.orders.get(&id).cloned())
    }

    async fn advance_order(
        &mut self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        method: Option<PaymentMethod>,
    ) -> Result<bool, StoreError> {
        let Some(order) = self.staged.orders.get_mut(&id) else {
            return Ok(false);
        };
        if order.status != from {
            return Ok(false);
        }
        let now = Utc::now();
        order.status = to;
        order.updated_at = now;
        if method.is_some() {
            order.payment_method = method;
        }
        if to == OrderStatus::Completed {
            order.delivered_at = Some(now);
        }
        Ok(true)
    }

    async fn insert_payment(&mut self, new: &NewPayment) -> Result<Payment, StoreError> {
        let t = &mut self.staged;
        if t.payments
            .values()
            .any(|p| p.transaction_id == new.transaction_id)
        {
            return Err(StoreError::Conflict(format!(
                "duplicate transaction_id {}",
                new.transaction_id
            )));
        }
        let now = Utc::now();
        let payment = Payment {
            id: t.next_id(),
            order_id: new.order_id,
            user_id: new.user_id,
            amount: new.amount,
            status: new.status,
            method: new.method,
            transaction_id: new.transaction_id.clone(),
            authority: None,
            reference_number: None,
            verification_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
            verified_at: (new.status == PaymentStatus::Completed).then_some(now),
        };
        t.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn lock_payment(&mut self, id: PaymentId) -> Result<Option<Payment>, StoreError> {
        Ok(self.staged.payments.get(&id).cloned())
    }

    async fn update_payment_if(
        &mut self,
        payment: &Payment,
        expected: PaymentStatus,
    ) -> Result<bool, StoreError> {
        let Some(stored) = self.staged.payments.get_mut(&payment.id) else {
            return Ok(false);
        };
        if stored.status != expected {
            return Ok(false);
        }
        stored.status = payment.status;
        stored.authority = payment.authority.clone();
        stored.reference_number = payment.reference_number.clone();
        stored.verification_url = payment.verification_url.clone();
        stored.error_message = payment.error_message.clone();
        stored.verified_at = payment.verified_at;
        stored.updated_at = Utc::now();
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::UserProfile;
    use rust_decimal_macros::dec;

    fn new_user(telegram_id: i64, code: &str) -> NewUser {
        NewUser {
            telegram_id,
            profile: UserProfile::default(),
            referral_code: code.into(),
            referred_by: None,
        }
    }

    #[tokio::test]
    async fn test_commit_publishes_staged_writes() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.insert_user(&new_user(100, "AAAA1111")).await.unwrap();
        tx.credit_wallet(user.id, dec!(500)).await.unwrap();
        tx.commit().await.unwrap();

        let stored = store.user(user.id).await.unwrap().unwrap();
        assert_eq!(stored.wallet_balance, dec!(500));
    }

    #[tokio::test]
    async fn test_drop_rolls_back() {
        let store = MemoryStore::new();
        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_user(&new_user(100, "AAAA1111")).await.unwrap();
        }
        assert!(store.user_by_telegram_id(100).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_conditional_debit() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let user = tx.insert_user(&new_user(1, "AAAA1111")).await.unwrap();
        tx.credit_wallet(user.id, dec!(100)).await.unwrap();
        assert!(!tx.debit_wallet(user.id, dec!(101)).await.unwrap());
        assert!(tx.debit_wallet(user.id, dec!(100)).await.unwrap());
        let locked = tx.lock_user(user.id).await.unwrap().unwrap();
        assert_eq!(locked.wallet_balance, Decimal::ZERO);
        assert_eq!(locked.total_spent, dec!(100));
    }

    #[tokio::test]
    async fn test_duplicate_telegram_id_conflicts() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_user(&new_user(1, "AAAA1111")).await.unwrap();
        let err = tx.insert_user(&new_user(1, "BBBB2222")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_payment_cas() {
        let store = MemoryStore::new();
        let mut tx = store.begin().await.unwrap();
        let payment = tx
            .insert_payment(&NewPayment {
                order_id: None,
                user_id: 1,
                amount: dec!(1000),
                status: PaymentStatus::Pending,
                method: PaymentMethod::Card,
                transaction_id: "TXN-1".into(),
            })
            .await
            .unwrap();

        let mut next = payment.clone();
        next.status = PaymentStatus::Verifying;
        assert!(tx.update_payment_if(&next, PaymentStatus::Pending).await.unwrap());
        // Second writer with a stale expectation loses
        assert!(!tx.update_payment_if(&next, PaymentStatus::Pending).await.unwrap());
    }
}
