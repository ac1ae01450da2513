//! End-to-end purchase behaviour on the in-memory store.

mod common;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use common::shop;
use permia_core::coupon::CouponError;
use permia_core::inventory::{UnitCredential, UnitStatus};
use permia_core::{OrderStatus, ProductType, PurchaseError, Store};

#[tokio::test]
async fn shared_purchase_debits_and_completes() {
    let shop = shop();
    shop.product("gpt_shared_3", ProductType::Shared, dec!(80000), 3).await;
    let user = shop.user(1001, dec!(100000)).await;

    let result = shop
        .state
        .orders
        .purchase(user.id, "gpt_shared_3", None)
        .await
        .unwrap();

    assert_eq!(result.status, OrderStatus::Completed);
    assert_eq!(result.amount, dec!(80000));
    assert_eq!(result.discount, Decimal::ZERO);
    assert_eq!(shop.balance(user.id).await, dec!(20000));
}

#[tokio::test]
async fn manual_purchase_is_paid_not_completed() {
    let shop = shop();
    shop.product("custom_setup", ProductType::ManualOrder, dec!(80000), 1).await;
    let user = shop.user(1002, dec!(100000)).await;

    let result = shop
        .state
        .orders
        .purchase(user.id, "custom_setup", None)
        .await
        .unwrap();

    assert_eq!(result.status, OrderStatus::Paid);
    assert_eq!(shop.balance(user.id).await, dec!(20000));
    assert!(shop.store.units_by_sku("custom_setup").await.unwrap().is_empty());
}

#[tokio::test]
async fn insufficient_funds_leaves_wallet_alone() {
    let shop = shop();
    shop.product("gpt_shared_3", ProductType::Shared, dec!(80000), 3).await;
    let user = shop.user(1003, dec!(50000)).await;

    let err = shop
        .state
        .orders
        .purchase(user.id, "gpt_shared_3", None)
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::InsufficientFunds { .. }));
    assert_eq!(shop.balance(user.id).await, dec!(50000));
    assert_eq!(shop.seats_sold("gpt_shared_3").await, 0);
    assert!(shop.store.orders_by_user(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn capped_coupon_discount() {
    let shop = shop();
    shop.product("gpt_shared_3", ProductType::Shared, dec!(80000), 3).await;
    shop.coupon("OFF50", dec!(50), dec!(30000), 0).await;
    let user = shop.user(1004, dec!(100000)).await;

    let result = shop
        .state
        .orders
        .purchase(user.id, "gpt_shared_3", Some("OFF50"))
        .await
        .unwrap();

    assert_eq!(result.discount, dec!(30000));
    assert_eq!(result.amount, dec!(50000));
    assert_eq!(shop.balance(user.id).await, dec!(50000));

    let order = shop.store.order(result.order_id).await.unwrap().unwrap();
    assert!(order.coupon_id.is_some());
}

#[tokio::test]
async fn shared_unit_fills_then_new_unit_opens() {
    let shop = shop();
    shop.product("gpt_shared_3", ProductType::Shared, dec!(10000), 3).await;
    let user = shop.user(1005, dec!(100000)).await;

    for expected_users in 1..=3 {
        shop.state
            .orders
            .purchase(user.id, "gpt_shared_3", None)
            .await
            .unwrap();
        let units = shop.store.units_by_sku("gpt_shared_3").await.unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].current_users, expected_users);
    }

    let units = shop.store.units_by_sku("gpt_shared_3").await.unwrap();
    assert_eq!(units[0].status, UnitStatus::Filled);
    let first_unit = units[0].id;

    shop.state
        .orders
        .purchase(user.id, "gpt_shared_3", None)
        .await
        .unwrap();

    let units = shop.store.units_by_sku("gpt_shared_3").await.unwrap();
    assert_eq!(units.len(), 2);
    let second = units.iter().find(|u| u.id != first_unit).unwrap();
    assert_eq!(second.current_users, 1);
    assert_eq!(second.max_users, 3);
    assert_eq!(second.status, UnitStatus::Available);

    // Every order points at the unit it was seated in
    let orders = shop.store.orders_by_user(user.id).await.unwrap();
    assert_eq!(orders.len(), 4);
    assert_eq!(
        orders.iter().filter(|o| o.account_id == Some(first_unit)).count(),
        3
    );
}

#[tokio::test]
async fn partial_unit_preferred_over_empty_one() {
    let shop = shop();
    shop.product("gemini_shared", ProductType::Shared, dec!(10000), 2).await;
    let units = shop
        .state
        .pool
        .restock(
            "gemini_shared",
            &[
                UnitCredential {
                    email: "a@example.com".into(),
                    password: "pa".into(),
                    additional: String::new(),
                },
                UnitCredential {
                    email: "b@example.com".into(),
                    password: "pb".into(),
                    additional: String::new(),
                },
            ],
            None,
        )
        .await
        .unwrap();
    let user = shop.user(1006, dec!(100000)).await;

    let first = shop
        .state
        .orders
        .purchase(user.id, "gemini_shared", None)
        .await
        .unwrap();
    let second = shop
        .state
        .orders
        .purchase(user.id, "gemini_shared", None)
        .await
        .unwrap();

    let o1 = shop.store.order(first.order_id).await.unwrap().unwrap();
    let o2 = shop.store.order(second.order_id).await.unwrap().unwrap();
    assert_eq!(o1.account_id, Some(units[0].id));
    assert_eq!(o2.account_id, Some(units[0].id));
    assert!(first.delivered_data.contains("a@example.com"));
}

#[tokio::test]
async fn ready_made_out_of_stock_changes_nothing() {
    let shop = shop();
    shop.product("gpt_ready", ProductType::ReadyMade, dec!(30000), 1).await;
    shop.state
        .pool
        .restock(
            "gpt_ready",
            &[UnitCredential {
                email: "solo@example.com".into(),
                password: "secret".into(),
                additional: String::new(),
            }],
            None,
        )
        .await
        .unwrap();
    let buyer = shop.user(1007, dec!(100000)).await;

    shop.state
        .orders
        .purchase(buyer.id, "gpt_ready", None)
        .await
        .unwrap();
    let before = shop.store.units_by_sku("gpt_ready").await.unwrap();
    let balance_before = shop.balance(buyer.id).await;

    let err = shop
        .state
        .orders
        .purchase(buyer.id, "gpt_ready", None)
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::OutOfStock(_)));
    assert_eq!(shop.balance(buyer.id).await, balance_before);
    assert_eq!(shop.store.units_by_sku("gpt_ready").await.unwrap(), before);
    assert_eq!(shop.store.orders_by_user(buyer.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn card_issuer_failure_rolls_everything_back() {
    let shop = shop();
    shop.product("gpt_private", ProductType::PrivateLegal, dec!(90000), 1).await;
    shop.coupon("OFF10", dec!(10), dec!(0), 1).await;
    let user = shop.user(1008, dec!(100000)).await;

    shop.issuer.set_fail(true);
    let err = shop
        .state
        .orders
        .purchase(user.id, "gpt_private", Some("OFF10"))
        .await
        .unwrap_err();

    assert!(matches!(err, PurchaseError::FulfillmentProvider(_)));
    assert_eq!(shop.balance(user.id).await, dec!(100000));
    assert!(shop.store.orders_by_user(user.id).await.unwrap().is_empty());
    let coupon = shop
        .store
        .coupon_by_code("OFF10", Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(coupon.used_count, 0);

    // The coupon use was not burned by the failed attempt
    shop.issuer.set_fail(false);
    let result = shop
        .state
        .orders
        .purchase(user.id, "gpt_private", Some("OFF10"))
        .await
        .unwrap();
    assert_eq!(result.status, OrderStatus::Completed);
    assert_eq!(result.amount, dec!(81000));
    assert_eq!(shop.issuer.issued_count(), 1);
}

#[tokio::test]
async fn single_use_coupon_exhausts() {
    let shop = shop();
    shop.product("gpt_shared_3", ProductType::Shared, dec!(80000), 3).await;
    shop.coupon("ONCE", dec!(20), dec!(0), 1).await;
    let alice = shop.user(1009, dec!(100000)).await;
    let bob = shop.user(1010, dec!(100000)).await;

    shop.state
        .orders
        .purchase(alice.id, "gpt_shared_3", Some("ONCE"))
        .await
        .unwrap();
    let err = shop
        .state
        .orders
        .purchase(bob.id, "gpt_shared_3", Some("ONCE"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PurchaseError::CouponInvalid(CouponError::UsageExhausted(_))
    ));
    assert_eq!(err.code(), "COUPON_EXHAUSTED");
    assert_eq!(shop.balance(bob.id).await, dec!(100000));

    let coupon = shop
        .store
        .coupon_by_code("ONCE", Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(coupon.used_count, 1);
}

#[tokio::test]
async fn assigned_coupon_rejects_other_users() {
    let shop = shop();
    shop.product("gpt_shared_3", ProductType::Shared, dec!(80000), 3).await;
    let owner = shop.user(1011, dec!(100000)).await;
    let other = shop.user(1012, dec!(100000)).await;
    let mut coupon = shop.coupon("VIP", dec!(10), dec!(0), 0).await;
    coupon.code = "VIP2".into();
    coupon.assignee_id = Some(owner.id);
    shop.store.seed_coupon(coupon).await.unwrap();

    let err = shop
        .state
        .orders
        .purchase(other.id, "gpt_shared_3", Some("VIP2"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PurchaseError::CouponInvalid(CouponError::NotAssignedToUser(_))
    ));

    let result = shop
        .state
        .orders
        .purchase(owner.id, "gpt_shared_3", Some("VIP2"))
        .await
        .unwrap();
    assert_eq!(result.amount, dec!(72000));
}

#[tokio::test]
async fn balance_plus_spend_is_conserved() {
    let shop = shop();
    shop.product("gpt_shared_3", ProductType::Shared, dec!(30000), 3).await;
    shop.product("gpt_ready", ProductType::ReadyMade, dec!(20000), 1).await;
    shop.coupon("HALF", dec!(50), dec!(0), 0).await;
    let user = shop.user(1013, dec!(100000)).await;
    let mut credited = dec!(100000);

    let topup = shop
        .state
        .payments
        .charge(permia_core::payment::ChargeRequest {
            user_id: user.id,
            context: permia_core::payment::ChargeContext::Topup,
            amount: dec!(40000),
            method: permia_core::order::PaymentMethod::Card,
        })
        .await
        .unwrap();
    let payment = shop.store.payment(topup.payment_id).await.unwrap().unwrap();
    shop.state
        .payments
        .verify(payment.id, payment.authority.as_deref().unwrap(), None)
        .await
        .unwrap();
    credited += dec!(40000);

    let attempts: [(&str, Option<&str>); 5] = [
        ("gpt_shared_3", None),
        ("gpt_ready", None), // no stock
        ("gpt_shared_3", Some("HALF")),
        ("gpt_shared_3", Some("NOPE")),
        ("gpt_shared_3", None),
    ];
    for (sku, coupon) in attempts {
        let _ = shop.state.orders.purchase(user.id, sku, coupon).await;

        let u = shop.store.user(user.id).await.unwrap().unwrap();
        assert_eq!(u.wallet_balance + u.total_spent, credited);
        assert!(u.wallet_balance >= Decimal::ZERO);
    }

    let spent: Decimal = shop
        .store
        .orders_by_user(user.id)
        .await
        .unwrap()
        .iter()
        .map(|o| o.amount)
        .sum();
    assert_eq!(spent, dec!(75000));
    assert_eq!(shop.balance(user.id).await, dec!(65000));
}
