//! Coupon models and discount arithmetic

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::CouponError;
use crate::core_types::{CouponId, UserId};

/// Discount code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    /// Unique, matched case-sensitively
    pub code: String,
    /// 0..=100
    pub percent: Decimal,
    /// Cap on the discount; zero means uncapped
    pub max_discount: Decimal,
    /// Zero means unlimited
    pub usage_limit: i32,
    pub used_count: i32,
    pub expires_at: Option<DateTime<Utc>>,
    /// When set, only this user may apply the code
    pub assignee_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_limit > 0 && self.used_count >= self.usage_limit
    }

    /// Eligibility checks in the order callers observe them:
    /// expiry, assignment, exhaustion.
    pub fn check_claim(&self, claimant: UserId, now: DateTime<Utc>) -> Result<(), CouponError> {
        if self.is_expired(now) {
            return Err(CouponError::NotFound(self.code.clone()));
        }
        if let Some(assignee) = self.assignee_id
            && assignee != claimant
        {
            return Err(CouponError::NotAssignedToUser(self.code.clone()));
        }
        if self.is_exhausted() {
            return Err(CouponError::UsageExhausted(self.code.clone()));
        }
        Ok(())
    }

    /// Price breakdown for `original`.
    pub fn quote(&self, original: Decimal) -> Discount {
        let discount = discount_amount(original, self.percent, self.max_discount);
        Discount {
            coupon_id: self.id,
            original,
            discount,
            final_amount: (original - discount).max(Decimal::ZERO),
        }
    }
}

/// `original * percent / 100` rounded down to a whole Toman, clamped to
/// `max_discount` when that cap is positive and lower. Never negative.
pub fn discount_amount(original: Decimal, percent: Decimal, max_discount: Decimal) -> Decimal {
    let mut discount = (original * percent / Decimal::ONE_HUNDRED).floor();
    if max_discount > Decimal::ZERO && discount > max_discount {
        discount = max_discount;
    }
    discount.max(Decimal::ZERO)
}

/// Outcome of applying or previewing a coupon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Discount {
    pub coupon_id: CouponId,
    pub original: Decimal,
    pub discount: Decimal,
    pub final_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn coupon() -> Coupon {
        Coupon {
            id: 7,
            code: "OFF50".into(),
            percent: dec!(50),
            max_discount: dec!(30000),
            usage_limit: 1,
            used_count: 0,
            expires_at: None,
            assignee_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_discount_capped() {
        let q = coupon().quote(dec!(80000));
        assert_eq!(q.discount, dec!(30000));
        assert_eq!(q.final_amount, dec!(50000));
    }

    #[test]
    fn test_discount_uncapped_when_cap_is_zero() {
        assert_eq!(discount_amount(dec!(80000), dec!(50), Decimal::ZERO), dec!(40000));
        assert_eq!(discount_amount(dec!(80000), dec!(10), dec!(30000)), dec!(8000));
    }

    #[test]
    fn test_discount_rounds_down_to_whole_units() {
        assert_eq!(discount_amount(dec!(33333), dec!(10), Decimal::ZERO), dec!(3333));
    }

    #[test]
    fn test_final_amount_never_negative() {
        let mut c = coupon();
        c.percent = dec!(150);
        c.max_discount = Decimal::ZERO;
        let q = c.quote(dec!(1000));
        assert_eq!(q.final_amount, Decimal::ZERO);
    }

    #[test]
    fn test_check_claim_order() {
        let now = Utc::now();
        let mut c = coupon();
        c.expires_at = Some(now - Duration::minutes(1));
        c.assignee_id = Some(2);
        c.used_count = 1;
        assert!(matches!(c.check_claim(1, now), Err(CouponError::NotFound(_))));

        c.expires_at = Some(now + Duration::days(1));
        assert!(matches!(
            c.check_claim(1, now),
            Err(CouponError::NotAssignedToUser(_))
        ));

        assert!(matches!(
            c.check_claim(2, now),
            Err(CouponError::UsageExhausted(_))
        ));

        c.used_count = 0;
        assert!(c.check_claim(2, now).is_ok());
    }

    #[test]
    fn test_unlimited_usage() {
        let mut c = coupon();
        c.usage_limit = 0;
        c.used_count = 10_000;
        assert!(!c.is_exhausted());
    }
}
