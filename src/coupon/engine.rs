//! Coupon engine
//!
//! `validate` is the side-effect-free preview a user can repeat freely.
//! `apply` runs inside the purchase transaction and burns exactly one use.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;

use super::error::CouponError;
use super::models::{Coupon, Discount};
use crate::core_types::UserId;
use crate::store::{Store, StoreTx};

pub struct CouponEngine {
    store: Arc<dyn Store>,
}

impl CouponEngine {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Price `original` with `code` for `claimant` without consuming a use.
    pub async fn validate(
        &self,
        code: &str,
        claimant: UserId,
        original: Decimal,
    ) -> Result<Discount, CouponError> {
        let now = Utc::now();
        let coupon = self
            .store
            .coupon_by_code(code, now)
            .await?
            .ok_or_else(|| CouponError::NotFound(code.to_string()))?;
        coupon.check_claim(claimant, now)?;
        Ok(coupon.quote(original))
    }

    /// Validate and consume one use of `code` under the coupon row lock.
    ///
    /// The usage counter is a conditional increment, so two transactions
    /// racing for the last use cannot both succeed.
    pub async fn apply(
        &self,
        tx: &mut dyn StoreTx,
        code: &str,
        claimant: UserId,
        original: Decimal,
    ) -> Result<Discount, CouponError> {
        let now = Utc::now();
        let coupon = tx
            .lock_coupon(code)
            .await?
            .ok_or_else(|| CouponError::NotFound(code.to_string()))?;
        coupon.check_claim(claimant, now)?;

        if !tx.increment_coupon_usage(coupon.id).await? {
            return Err(CouponError::UsageExhausted(code.to_string()));
        }

        let discount = coupon.quote(original);
        debug!(
            coupon_id = coupon.id,
            user_id = claimant,
            discount = %discount.discount,
            "Coupon applied"
        );
        Ok(discount)
    }

    /// Unexpired, non-exhausted coupons that are public or assigned to
    /// `user_id`.
    pub async fn available_for(&self, user_id: UserId) -> Result<Vec<Coupon>, CouponError> {
        let coupons = self.store.coupons_for_user(user_id, Utc::now()).await?;
        Ok(coupons.into_iter().filter(|c| !c.is_exhausted()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn coupon(code: &str, usage_limit: i32) -> Coupon {
        Coupon {
            id: 0,
            code: code.into(),
            percent: dec!(50),
            max_discount: dec!(30000),
            usage_limit,
            used_count: 0,
            expires_at: None,
            assignee_id: None,
            created_at: Utc::now(),
        }
    }

    async fn engine_with(coupons: Vec<Coupon>) -> (MemoryStore, CouponEngine) {
        let store = MemoryStore::new();
        for c in coupons {
            store.seed_coupon(c).await.unwrap();
        }
        let engine = CouponEngine::new(Arc::new(store.clone()));
        (store, engine)
    }

    #[tokio::test]
    async fn test_validate_is_repeatable() {
        let (store, engine) = engine_with(vec![coupon("OFF50", 1)]).await;
        for _ in 0..3 {
            let d = engine.validate("OFF50", 1, dec!(80000)).await.unwrap();
            assert_eq!(d.final_amount, dec!(50000));
        }
        let c = store.coupon_by_code("OFF50", Utc::now()).await.unwrap().unwrap();
        assert_eq!(c.used_count, 0);
    }

    #[tokio::test]
    async fn test_apply_burns_one_use() {
        let (store, engine) = engine_with(vec![coupon("OFF50", 1)]).await;

        let mut tx = store.begin().await.unwrap();
        let d = engine
            .apply(tx.as_mut(), "OFF50", 1, dec!(80000))
            .await
            .unwrap();
        assert_eq!(d.discount, dec!(30000));
        let err = engine
            .apply(tx.as_mut(), "OFF50", 1, dec!(80000))
            .await
            .unwrap_err();
        assert!(matches!(err, CouponError::UsageExhausted(_)));
        tx.commit().await.unwrap();

        let c = store.coupon_by_code("OFF50", Utc::now()).await.unwrap().unwrap();
        assert_eq!(c.used_count, 1);
    }

    #[tokio::test]
    async fn test_expired_is_not_found() {
        let mut expired = coupon("OLD", 0);
        expired.expires_at = Some(Utc::now() - Duration::hours(1));
        let (store, engine) = engine_with(vec![expired]).await;

        assert!(matches!(
            engine.validate("OLD", 1, dec!(100)).await,
            Err(CouponError::NotFound(_))
        ));
        let mut tx = store.begin().await.unwrap();
        assert!(matches!(
            engine.apply(tx.as_mut(), "OLD", 1, dec!(100)).await,
            Err(CouponError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_assigned_coupon() {
        let mut personal = coupon("VIP", 0);
        personal.assignee_id = Some(42);
        let (_store, engine) = engine_with(vec![personal, coupon("PUBLIC", 0)]).await;

        assert!(matches!(
            engine.validate("VIP", 7, dec!(100)).await,
            Err(CouponError::NotAssignedToUser(_))
        ));
        assert!(engine.validate("VIP", 42, dec!(100)).await.is_ok());

        let mine: Vec<String> = engine
            .available_for(42)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.code)
            .collect();
        assert_eq!(mine, vec!["VIP".to_string(), "PUBLIC".to_string()]);
        assert_eq!(engine.available_for(7).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_hidden_from_listing() {
        let mut used = coupon("USED", 2);
        used.used_count = 2;
        let (_store, engine) = engine_with(vec![used]).await;
        assert!(engine.available_for(1).await.unwrap().is_empty());
    }
}
