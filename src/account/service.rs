//! User registration and wallet reads

use std::sync::Arc;

use rand::Rng;
use rand::distributions::Alphanumeric;
use thiserror::Error;
use tracing::{info, warn};

use super::models::{NewUser, REFERRAL_CODE_LEN, User, UserProfile};
use super::wallet::WalletAccount;
use crate::core_types::UserId;
use crate::store::{Store, StoreError};

/// Attempts at drawing a referral code nobody holds yet
const REFERRAL_CODE_ATTEMPTS: usize = 5;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("User {0} is banned")]
    UserBanned(UserId),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AccountError {
    pub fn code(&self) -> &'static str {
        match self {
            AccountError::UserNotFound(_) => "USER_NOT_FOUND",
            AccountError::UserBanned(_) => "USER_BANNED",
            AccountError::Store(e) if e.is_conflict() => "CONCURRENCY_CONFLICT",
            AccountError::Store(_) => "INTERNAL_ERROR",
        }
    }
}

/// Random mixed-case alphanumeric referral code.
pub fn generate_referral_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFERRAL_CODE_LEN)
        .map(char::from)
        .collect()
}

pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Return the user for `telegram_id`, registering them on first contact.
    ///
    /// A `referral_code` naming another existing user sets `referred_by`
    /// and bumps that user's `total_referrals` in the same transaction.
    /// Unknown or self-referencing codes are ignored.
    pub async fn get_or_create(
        &self,
        telegram_id: i64,
        profile: UserProfile,
        referral_code: Option<&str>,
    ) -> Result<User, AccountError> {
        if let Some(user) = self.store.user_by_telegram_id(telegram_id).await? {
            return Ok(user);
        }

        match self.register(telegram_id, profile, referral_code).await {
            Ok(user) => Ok(user),
            // Lost a race with a concurrent first contact
            Err(AccountError::Store(e)) if e.is_conflict() => self
                .store
                .user_by_telegram_id(telegram_id)
                .await?
                .ok_or(AccountError::Store(e)),
            Err(e) => Err(e),
        }
    }

    async fn register(
        &self,
        telegram_id: i64,
        profile: UserProfile,
        referral_code: Option<&str>,
    ) -> Result<User, AccountError> {
        let mut tx = self.store.begin().await?;

        if let Some(existing) = tx.user_by_telegram_id(telegram_id).await? {
            return Ok(existing);
        }

        let referrer = match referral_code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => tx
                .user_by_referral_code(code)
                .await?
                .filter(|r| r.telegram_id != telegram_id),
            None => None,
        };

        let mut own_code = generate_referral_code();
        for _ in 1..REFERRAL_CODE_ATTEMPTS {
            if tx.user_by_referral_code(&own_code).await?.is_none() {
                break;
            }
            own_code = generate_referral_code();
        }

        let user = tx
            .insert_user(&NewUser {
                telegram_id,
                profile,
                referral_code: own_code,
                referred_by: referrer.as_ref().map(|r| r.id),
            })
            .await?;

        if let Some(referrer) = &referrer {
            tx.increment_referrals(referrer.id).await?;
        }
        tx.commit().await?;

        info!(
            user_id = user.id,
            telegram_id,
            referred_by = ?user.referred_by,
            "User registered"
        );
        Ok(user)
    }

    pub async fn user(&self, user_id: UserId) -> Result<User, AccountError> {
        self.store
            .user(user_id)
            .await?
            .ok_or(AccountError::UserNotFound(user_id))
    }

    /// Current wallet snapshot (unlocked read).
    pub async fn balance(&self, user_id: UserId) -> Result<WalletAccount, AccountError> {
        let user = self.user(user_id).await?;
        if user.is_banned {
            warn!(user_id, "Balance read for banned user");
        }
        Ok(WalletAccount::of(&user))
    }
}
