//! Payment Service
//!
//! Drives payment records through the charge → verify state machine.
//!
//! Every external gateway call happens outside any store transaction:
//! the row is persisted first (PENDING), the gateway is called, and the
//! outcome is written back with a compare-and-swap on the status. A
//! VERIFYING payment is only ever written after the gateway confirmed the
//! request, and a timeout during verify leaves the row untouched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::error::PaymentError;
use super::gateway::{GatewayError, PaymentGateway, VerifyReceipt};
use super::state::{OpResult, PaymentStatus};
use super::types::{
    ChargeContext, ChargeRequest, NewPayment, Payment, PaymentResult, new_transaction_id,
};
use crate::account::{User, WalletAccount, WalletError};
use crate::core_types::{OrderId, PaymentId, UserId};
use crate::money;
use crate::order::{Order, OrderStatus, PaymentMethod};
use crate::store::{Store, StoreTx};

/// Error text stored when the user backs out on the gateway page
const CANCELLED_BY_USER: &str = "Cancelled by user at gateway";

impl From<WalletError> for PaymentError {
    fn from(e: WalletError) -> Self {
        match e {
            WalletError::InsufficientFunds {
                required,
                available,
            } => PaymentError::InsufficientFunds {
                required,
                available,
            },
            WalletError::InvalidAmount => PaymentError::InvalidAmount(e.to_string()),
        }
    }
}

pub struct PaymentService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    callback_url: String,
    timeout: Duration,
}

impl PaymentService {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        callback_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            callback_url: callback_url.into(),
            timeout,
        }
    }

    pub async fn payment(&self, payment_id: PaymentId) -> Result<Payment, PaymentError> {
        self.store
            .payment(payment_id)
            .await?
            .ok_or(PaymentError::NotFound(payment_id))
    }

    pub async fn payment_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> Result<Option<Payment>, PaymentError> {
        Ok(self.store.payment_by_transaction_id(transaction_id).await?)
    }

    /// Start a charge.
    ///
    /// * `wallet` pays a pending order from the wallet in one step
    ///   (PENDING → COMPLETED inside one transaction).
    /// * `card` opens a gateway intent and returns the redirect URL
    ///   (PENDING → VERIFYING), or records FAILED and returns
    ///   `ExternalProvider` when the gateway refuses or times out.
    pub async fn charge(&self, req: ChargeRequest) -> Result<PaymentResult, PaymentError> {
        let amount = money::validate_amount(req.amount)?;
        match req.method {
            PaymentMethod::Wallet => match req.context {
                ChargeContext::Order { order_id } => {
                    self.charge_wallet(req.user_id, order_id, amount).await
                }
                ChargeContext::Topup => Err(PaymentError::InvalidMethod(
                    "wallet cannot be used to top up the wallet".to_string(),
                )),
            },
            PaymentMethod::Card => self.charge_card(req.user_id, req.context, amount).await,
        }
    }

    async fn charge_wallet(
        &self,
        user_id: UserId,
        order_id: OrderId,
        amount: Decimal,
    ) -> Result<PaymentResult, PaymentError> {
        let mut tx = self.store.begin().await?;

        let user = lock_active_user(tx.as_mut(), user_id).await?;
        let order = lock_payable_order(tx.as_mut(), user_id, order_id, amount).await?;

        WalletAccount::of(&user).ensure_covers(amount)?;
        if !tx.debit_wallet(user_id, amount).await? {
            return Err(PaymentError::InsufficientFunds {
                required: amount,
                available: user.wallet_balance,
            });
        }

        let payment = tx
            .insert_payment(&NewPayment {
                order_id: Some(order.id),
                user_id,
                amount,
                status: PaymentStatus::Completed,
                method: PaymentMethod::Wallet,
                transaction_id: new_transaction_id(),
            })
            .await?;

        if !tx
            .advance_order(
                order.id,
                OrderStatus::Pending,
                OrderStatus::Paid,
                Some(PaymentMethod::Wallet),
            )
            .await?
        {
            return Err(PaymentError::ConcurrencyConflict(format!(
                "order {} changed during payment",
                order.id
            )));
        }
        tx.commit().await?;

        info!(
            payment_id = payment.id,
            user_id,
            order_id = order.id,
            amount = %amount,
            "Wallet payment completed"
        );
        Ok(PaymentResult::from(&payment))
    }

    async fn charge_card(
        &self,
        user_id: UserId,
        context: ChargeContext,
        amount: Decimal,
    ) -> Result<PaymentResult, PaymentError> {
        let gateway_amount = money::to_gateway_amount(amount)?;

        // Step 1: persist PENDING before calling out
        let mut tx = self.store.begin().await?;
        lock_active_user(tx.as_mut(), user_id).await?;
        let order = match context.order_id() {
            Some(order_id) => {
                Some(lock_payable_order(tx.as_mut(), user_id, order_id, amount).await?)
            }
            None => None,
        };
        let payment = tx
            .insert_payment(&NewPayment {
                order_id: order.as_ref().map(|o| o.id),
                user_id,
                amount,
                status: PaymentStatus::Pending,
                method: PaymentMethod::Card,
                transaction_id: new_transaction_id(),
            })
            .await?;
        tx.commit().await?;

        // Step 2: gateway request, no locks held
        let description = match &order {
            Some(o) => format!("Order {} ({} Toman)", o.order_number, money::format_amount(amount)),
            None => format!("Wallet top-up {} Toman", money::format_amount(amount)),
        };
        let callback = self.callback_for(payment.id);
        let outcome = self
            .call(self.gateway.request_payment(gateway_amount, &description, &callback))
            .await;

        // Step 3: record the outcome
        match outcome {
            OpResult::Success(intent) => {
                let mut next = payment.clone();
                next.status = PaymentStatus::Verifying;
                next.authority = Some(intent.authority);
                next.verification_url = Some(intent.redirect_url);
                self.write_if(&next, PaymentStatus::Pending).await?;

                info!(
                    payment_id = payment.id,
                    user_id,
                    amount = %amount,
                    gateway = self.gateway.name(),
                    "Gateway payment requested"
                );
                Ok(PaymentResult::from(&next))
            }
            OpResult::Failed(msg) | OpResult::Pending(msg) => {
                let mut next = payment.clone();
                next.status = PaymentStatus::Failed;
                next.error_message = Some(msg.clone());
                self.write_if(&next, PaymentStatus::Pending).await?;

                warn!(payment_id = payment.id, user_id, error = %msg, "Gateway request failed");
                Err(PaymentError::ExternalProvider(format!(
                    "payment {}: {}",
                    payment.id, msg
                )))
            }
        }
    }

    /// Verify a gateway payment after the user returns.
    ///
    /// Terminal payments return their stored result unchanged, so gateway
    /// callback retries are harmless. `claimed_amount`, when given, must
    /// equal the amount originally requested.
    pub async fn verify(
        &self,
        payment_id: PaymentId,
        authority: &str,
        claimed_amount: Option<Decimal>,
    ) -> Result<PaymentResult, PaymentError> {
        let payment = self.payment(payment_id).await?;
        check_authority(&payment, authority)?;

        if payment.status.is_terminal() {
            return Ok(PaymentResult::from(&payment));
        }
        if payment.status != PaymentStatus::Verifying {
            return Err(PaymentError::InvalidState {
                id: payment.id,
                status: payment.status,
                action: "verify",
            });
        }
        if let Some(actual) = claimed_amount
            && actual != payment.amount
        {
            warn!(payment_id, expected = %payment.amount, actual = %actual, "Verify amount mismatch");
            return Err(PaymentError::AmountMismatch {
                expected: payment.amount,
                actual,
            });
        }

        self.settle(payment).await
    }

    /// Gateway round-trip for a VERIFYING payment using its stored amount
    /// and authority.
    pub(crate) async fn settle(&self, payment: Payment) -> Result<PaymentResult, PaymentError> {
        let gateway_amount = money::to_gateway_amount(payment.amount)?;
        let authority = payment.authority.clone().unwrap_or_default();

        match self
            .call(self.gateway.verify_payment(gateway_amount, &authority))
            .await
        {
            OpResult::Success(receipt) => self.complete(&payment, receipt).await,
            OpResult::Failed(msg) => {
                warn!(payment_id = payment.id, error = %msg, "Gateway declined payment");
                self.close(payment.id, PaymentStatus::Failed, &msg).await
            }
            OpResult::Pending(msg) => {
                warn!(payment_id = payment.id, error = %msg, "Gateway verify inconclusive, staying VERIFYING");
                Err(PaymentError::ExternalProvider(format!(
                    "payment {}: {}",
                    payment.id, msg
                )))
            }
        }
    }

    /// The user backed out on the gateway page.
    pub async fn cancel(
        &self,
        payment_id: PaymentId,
        authority: &str,
    ) -> Result<PaymentResult, PaymentError> {
        let payment = self.payment(payment_id).await?;
        check_authority(&payment, authority)?;

        if payment.status.is_terminal() {
            return Ok(PaymentResult::from(&payment));
        }
        if payment.status != PaymentStatus::Verifying {
            return Err(PaymentError::InvalidState {
                id: payment.id,
                status: payment.status,
                action: "cancel",
            });
        }

        // A cancel redirect carries no proof; ask the gateway before closing.
        let gateway_amount = money::to_gateway_amount(payment.amount)?;
        match self
            .call(self.gateway.verify_payment(gateway_amount, authority))
            .await
        {
            OpResult::Success(receipt) => {
                warn!(payment_id, "Cancel received for a paid payment, completing instead");
                self.complete(&payment, receipt).await
            }
            OpResult::Failed(_) => {
                info!(payment_id, "Payment cancelled at gateway");
                self.close(payment_id, PaymentStatus::Cancelled, CANCELLED_BY_USER)
                    .await
            }
            OpResult::Pending(msg) => {
                warn!(payment_id, error = %msg, "Cancel not confirmed, staying VERIFYING");
                Err(PaymentError::ExternalProvider(format!(
                    "payment {}: {}",
                    payment_id, msg
                )))
            }
        }
    }

    /// Mark a PENDING payment whose gateway request was never confirmed.
    pub(crate) async fn expire_pending(
        &self,
        payment_id: PaymentId,
    ) -> Result<PaymentResult, PaymentError> {
        let mut tx = self.store.begin().await?;
        let payment = tx
            .lock_payment(payment_id)
            .await?
            .ok_or(PaymentError::NotFound(payment_id))?;
        if payment.status != PaymentStatus::Pending {
            return Ok(PaymentResult::from(&payment));
        }
        let mut next = payment;
        next.status = PaymentStatus::Failed;
        next.error_message = Some("Gateway request never confirmed".to_string());
        tx.update_payment_if(&next, PaymentStatus::Pending).await?;
        tx.commit().await?;
        Ok(PaymentResult::from(&next))
    }

    /// VERIFYING → COMPLETED and apply the money: advance the order, or
    /// credit the wallet for a top-up.
    async fn complete(
        &self,
        payment: &Payment,
        receipt: VerifyReceipt,
    ) -> Result<PaymentResult, PaymentError> {
        let mut tx = self.store.begin().await?;

        // user → payment → order
        tx.lock_user(payment.user_id)
            .await?
            .ok_or(PaymentError::UserNotFound(payment.user_id))?;
        let current = tx
            .lock_payment(payment.id)
            .await?
            .ok_or(PaymentError::NotFound(payment.id))?;

        if current.status.is_terminal() {
            // A concurrent verify got here first
            return Ok(PaymentResult::from(&current));
        }
        if current.status != PaymentStatus::Verifying {
            return Err(PaymentError::InvalidState {
                id: current.id,
                status: current.status,
                action: "complete",
            });
        }

        let mut next = current.clone();
        next.status = PaymentStatus::Completed;
        next.reference_number = Some(receipt.reference_id);
        next.verified_at = Some(Utc::now());
        next.error_message = None;
        if !tx.update_payment_if(&next, PaymentStatus::Verifying).await? {
            return Err(PaymentError::ConcurrencyConflict(format!(
                "payment {} changed during verify",
                current.id
            )));
        }

        match current.order_id {
            Some(order_id) => {
                let advanced = match tx.lock_order(order_id).await? {
                    Some(order) if order.status == OrderStatus::Pending => {
                        tx.advance_order(
                            order_id,
                            OrderStatus::Pending,
                            OrderStatus::Paid,
                            Some(PaymentMethod::Card),
                        )
                        .await?
                    }
                    _ => false,
                };
                if advanced {
                    tx.record_spend(current.user_id, current.amount).await?;
                } else {
                    // Money arrived for an order that can no longer be paid;
                    // keep it in the wallet instead of losing it
                    warn!(
                        payment_id = current.id,
                        order_id,
                        "Order not payable at verify time, crediting wallet"
                    );
                    tx.credit_wallet(current.user_id, current.amount).await?;
                }
            }
            None => tx.credit_wallet(current.user_id, current.amount).await?,
        }
        tx.commit().await?;

        info!(
            payment_id = current.id,
            user_id = current.user_id,
            amount = %current.amount,
            already_verified = receipt.already_verified,
            "Payment completed"
        );
        Ok(PaymentResult::from(&next))
    }

    /// VERIFYING → FAILED | CANCELLED
    async fn close(
        &self,
        payment_id: PaymentId,
        status: PaymentStatus,
        reason: &str,
    ) -> Result<PaymentResult, PaymentError> {
        let mut tx = self.store.begin().await?;
        let current = tx
            .lock_payment(payment_id)
            .await?
            .ok_or(PaymentError::NotFound(payment_id))?;
        if current.status.is_terminal() {
            return Ok(PaymentResult::from(&current));
        }
        if !current.status.can_transition_to(status) {
            return Err(PaymentError::InvalidState {
                id: current.id,
                status: current.status,
                action: "close",
            });
        }

        let mut next = current.clone();
        next.status = status;
        next.error_message = Some(reason.to_string());
        if !tx.update_payment_if(&next, current.status).await? {
            return Err(PaymentError::ConcurrencyConflict(format!(
                "payment {} changed during close",
                payment_id
            )));
        }
        tx.commit().await?;
        Ok(PaymentResult::from(&next))
    }

    async fn write_if(&self, next: &Payment, expected: PaymentStatus) -> Result<(), PaymentError> {
        let mut tx = self.store.begin().await?;
        if !tx.update_payment_if(next, expected).await? {
            error!(payment_id = next.id, expected = %expected, "Payment status changed underneath");
            return Err(PaymentError::ConcurrencyConflict(format!(
                "payment {} is no longer {}",
                next.id, expected
            )));
        }
        tx.commit().await?;
        Ok(())
    }

    /// Bound a gateway call and classify its outcome.
    async fn call<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, GatewayError>>,
    ) -> OpResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => OpResult::Success(value),
            Ok(Err(e)) if e.is_definitive() => OpResult::Failed(e.to_string()),
            Ok(Err(e)) => OpResult::Pending(e.to_string()),
            Err(_) => OpResult::Pending(GatewayError::Timeout.to_string()),
        }
    }

    fn callback_for(&self, payment_id: PaymentId) -> String {
        let sep = if self.callback_url.contains('?') { '&' } else { '?' };
        format!("{}{}payment_id={}", self.callback_url, sep, payment_id)
    }
}

async fn lock_active_user(tx: &mut dyn StoreTx, user_id: UserId) -> Result<User, PaymentError> {
    let user = tx
        .lock_user(user_id)
        .await?
        .ok_or(PaymentError::UserNotFound(user_id))?;
    if user.is_banned {
        return Err(PaymentError::UserBanned(user_id));
    }
    Ok(user)
}

/// Lock an order the user owns that is PENDING at exactly `amount`.
async fn lock_payable_order(
    tx: &mut dyn StoreTx,
    user_id: UserId,
    order_id: OrderId,
    amount: Decimal,
) -> Result<Order, PaymentError> {
    let order = tx
        .lock_order(order_id)
        .await?
        .filter(|o| o.user_id == user_id)
        .ok_or(PaymentError::OrderNotFound(order_id))?;
    if order.status != OrderStatus::Pending {
        return Err(PaymentError::OrderNotPayable(order.id, order.status));
    }
    if order.amount != amount {
        return Err(PaymentError::AmountMismatch {
            expected: order.amount,
            actual: amount,
        });
    }
    Ok(order)
}

fn check_authority(payment: &Payment, authority: &str) -> Result<(), PaymentError> {
    match &payment.authority {
        Some(stored) if stored != authority => Err(PaymentError::AuthorityMismatch(payment.id)),
        None if payment.status == PaymentStatus::Verifying => {
            Err(PaymentError::AuthorityMismatch(payment.id))
        }
        _ => Ok(()),
    }
}
