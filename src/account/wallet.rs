//! Wallet account
//!
//! The user's store-held spendable balance. A `WalletAccount` is always
//! built from a user row that the caller holds locked (`FOR UPDATE`), so the
//! funds check here and the conditional debit in the store happen under the
//! same lock.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use super::models::User;
use crate::core_types::UserId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Wallet amount must not be negative")]
    InvalidAmount,
}

/// Snapshot of a locked wallet row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WalletAccount {
    pub user_id: UserId,
    pub balance: Decimal,
    pub total_spent: Decimal,
}

impl WalletAccount {
    pub fn of(user: &User) -> Self {
        Self {
            user_id: user.id,
            balance: user.wallet_balance,
            total_spent: user.total_spent,
        }
    }

    /// Check that `amount` can be debited without going negative.
    pub fn ensure_covers(&self, amount: Decimal) -> Result<(), WalletError> {
        if amount.is_sign_negative() {
            return Err(WalletError::InvalidAmount);
        }
        if self.balance < amount {
            return Err(WalletError::InsufficientFunds {
                required: amount,
                available: self.balance,
            });
        }
        Ok(())
    }

    /// Debit a purchase. Counts toward `total_spent`.
    pub fn debit(&mut self, amount: Decimal) -> Result<(), WalletError> {
        self.ensure_covers(amount)?;
        self.balance -= amount;
        self.total_spent += amount;
        Ok(())
    }

    /// Credit a verified top-up.
    pub fn credit(&mut self, amount: Decimal) -> Result<(), WalletError> {
        if amount.is_sign_negative() {
            return Err(WalletError::InvalidAmount);
        }
        self.balance += amount;
        Ok(())
    }
}
