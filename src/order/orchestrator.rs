//! Purchase Orchestrator
//!
//! The one place where wallet balance and inventory change together.
//!
//! A purchase runs in a single store transaction, locking rows in a fixed
//! order (user → coupon → inventory unit). Any failure drops the
//! transaction, so a rejected purchase leaves balance, coupon usage and
//! seat counters exactly as they were.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use super::error::PurchaseError;
use super::models::{NewOrder, Order, OrderStatus, PaymentMethod, new_order_number};
use crate::account::{User, WalletAccount};
use crate::card_issuer::CardIssuer;
use crate::catalog::{Fulfillment, Product};
use crate::config::CardIssuerConfig;
use crate::core_types::{CouponId, OrderId, UnitId, UserId};
use crate::coupon::CouponEngine;
use crate::inventory::{InventoryPool, InventoryUnit};
use crate::store::{Store, StoreTx};

/// Shown for orders an operator completes by hand
const MANUAL_DELIVERY: &str = "Order registered. Support will deliver it shortly.";
/// Shown for a seat in a unit whose credentials are not loaded yet
const PLACEHOLDER_DELIVERY: &str =
    "Order registered. Account credentials will be sent by support shortly.";

/// What the private-card path mints
#[derive(Debug, Clone)]
pub struct CardSettings {
    pub card_type: String,
    /// Balance loaded onto each card; unrelated to the product price
    pub card_amount: Decimal,
}

impl From<&CardIssuerConfig> for CardSettings {
    fn from(config: &CardIssuerConfig) -> Self {
        Self {
            card_type: config.card_type.clone(),
            card_amount: config.card_amount,
        }
    }
}

/// Outcome of a purchase or placed order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderResult {
    pub order_id: OrderId,
    pub order_number: String,
    pub amount: Decimal,
    pub discount: Decimal,
    pub status: OrderStatus,
    pub delivered_data: String,
}

impl OrderResult {
    fn new(order: &Order, discount: Decimal) -> Self {
        Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            amount: order.amount,
            discount,
            status: order.status,
            delivered_data: order.delivered_data.clone(),
        }
    }
}

/// Price after an optional coupon
struct Priced {
    amount: Decimal,
    discount: Decimal,
    coupon_id: Option<CouponId>,
}

/// Fulfillment decided inside the transaction
struct Delivery {
    status: OrderStatus,
    account_id: Option<UnitId>,
    text: String,
}

pub struct PurchaseOrchestrator {
    store: Arc<dyn Store>,
    pool: Arc<InventoryPool>,
    coupons: Arc<CouponEngine>,
    card_issuer: Arc<dyn CardIssuer>,
    card: CardSettings,
}

impl PurchaseOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        pool: Arc<InventoryPool>,
        coupons: Arc<CouponEngine>,
        card_issuer: Arc<dyn CardIssuer>,
        card: CardSettings,
    ) -> Self {
        Self {
            store,
            pool,
            coupons,
            card_issuer,
            card,
        }
    }

    /// Buy `sku` from the wallet, optionally with a coupon.
    ///
    /// On success the wallet is debited and the order is COMPLETED
    /// (pooled, card) or PAID (manual). On any error nothing is written.
    pub async fn purchase(
        &self,
        user_id: UserId,
        sku: &str,
        coupon_code: Option<&str>,
    ) -> Result<OrderResult, PurchaseError> {
        let mut tx = self.store.begin().await?;

        let product = active_product(tx.as_mut(), sku).await?;
        let user = lock_buyer(tx.as_mut(), user_id).await?;
        let priced = self
            .price(tx.as_mut(), user_id, &product, coupon_code)
            .await?;

        if let Err(e) = WalletAccount::of(&user).ensure_covers(priced.amount) {
            warn!(user_id, sku = %sku, error = %e, "Purchase rejected");
            return Err(PurchaseError::InsufficientFunds {
                required: priced.amount,
                available: user.wallet_balance,
            });
        }

        let delivery = self.fulfil(tx.as_mut(), &product).await?;

        if !tx.debit_wallet(user_id, priced.amount).await? {
            return Err(PurchaseError::InsufficientFunds {
                required: priced.amount,
                available: user.wallet_balance,
            });
        }

        let order = tx
            .insert_order(&NewOrder {
                order_number: new_order_number(user_id, Utc::now()),
                user_id,
                product_id: product.id,
                account_id: delivery.account_id,
                amount: priced.amount,
                coupon_id: priced.coupon_id,
                status: delivery.status,
                payment_method: Some(PaymentMethod::Wallet),
                delivered_data: delivery.text,
            })
            .await?;
        tx.commit().await?;

        info!(
            order_id = order.id,
            order_number = %order.order_number,
            user_id,
            sku = %sku,
            amount = %order.amount,
            discount = %priced.discount,
            status = %order.status,
            "Purchase completed"
        );
        Ok(OrderResult::new(&order, priced.discount))
    }

    /// Create a PENDING order at the (discounted) price, to be paid later
    /// through the payment service. Wallet and inventory are untouched; a
    /// coupon use is consumed.
    pub async fn place_order(
        &self,
        user_id: UserId,
        sku: &str,
        coupon_code: Option<&str>,
    ) -> Result<OrderResult, PurchaseError> {
        let mut tx = self.store.begin().await?;

        let product = active_product(tx.as_mut(), sku).await?;
        lock_buyer(tx.as_mut(), user_id).await?;
        let priced = self
            .price(tx.as_mut(), user_id, &product, coupon_code)
            .await?;

        let order = tx
            .insert_order(&NewOrder {
                order_number: new_order_number(user_id, Utc::now()),
                user_id,
                product_id: product.id,
                account_id: None,
                amount: priced.amount,
                coupon_id: priced.coupon_id,
                status: OrderStatus::Pending,
                payment_method: None,
                delivered_data: String::new(),
            })
            .await?;
        tx.commit().await?;

        info!(order_id = order.id, user_id, sku = %sku, amount = %order.amount, "Order placed");
        Ok(OrderResult::new(&order, priced.discount))
    }

    async fn price(
        &self,
        tx: &mut dyn StoreTx,
        user_id: UserId,
        product: &Product,
        coupon_code: Option<&str>,
    ) -> Result<Priced, PurchaseError> {
        match coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => {
                let d = self.coupons.apply(tx, code, user_id, product.price).await?;
                Ok(Priced {
                    amount: d.final_amount,
                    discount: d.discount,
                    coupon_id: Some(d.coupon_id),
                })
            }
            None => Ok(Priced {
                amount: product.price,
                discount: Decimal::ZERO,
                coupon_id: None,
            }),
        }
    }

    async fn fulfil(
        &self,
        tx: &mut dyn StoreTx,
        product: &Product,
    ) -> Result<Delivery, PurchaseError> {
        match product.product_type.fulfillment() {
            Fulfillment::Pooled => {
                let allocation = self.pool.allocate(tx, product).await?;
                Ok(Delivery {
                    status: OrderStatus::Completed,
                    account_id: Some(allocation.unit.id),
                    text: unit_delivery_text(&allocation.unit),
                })
            }
            Fulfillment::IssuedCard => {
                // Held inside the transaction: a failed issue must not debit
                let card = self
                    .card_issuer
                    .issue_card(self.card.card_amount, &self.card.card_type)
                    .await
                    .inspect_err(|e| {
                        warn!(sku = %product.sku, issuer = self.card_issuer.name(), error = %e, "Card issue failed");
                    })?;
                info!(sku = %product.sku, card = %card.masked_pan(), "Card issued");
                Ok(Delivery {
                    status: OrderStatus::Completed,
                    account_id: None,
                    text: card.delivery_text(),
                })
            }
            Fulfillment::Manual => Ok(Delivery {
                status: OrderStatus::Paid,
                account_id: None,
                text: MANUAL_DELIVERY.to_string(),
            }),
        }
    }
}

async fn active_product(tx: &mut dyn StoreTx, sku: &str) -> Result<Product, PurchaseError> {
    tx.product_by_sku(sku)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| PurchaseError::ProductNotFound(sku.to_string()))
}

async fn lock_buyer(tx: &mut dyn StoreTx, user_id: UserId) -> Result<User, PurchaseError> {
    let user = tx
        .lock_user(user_id)
        .await?
        .ok_or(PurchaseError::UserNotFound(user_id))?;
    if user.is_banned {
        return Err(PurchaseError::UserBanned(user_id));
    }
    Ok(user)
}

fn unit_delivery_text(unit: &InventoryUnit) -> String {
    if unit.is_placeholder() {
        return PLACEHOLDER_DELIVERY.to_string();
    }
    let mut text = format!("Email: {}\nPassword: {}", unit.email, unit.password);
    if !unit.additional.is_empty() {
        text.push('\n');
        text.push_str(&unit.additional);
    }
    text
}
