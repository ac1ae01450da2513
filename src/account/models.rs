//! Data models for shop users

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core_types::UserId;

/// Length of generated referral codes
pub const REFERRAL_CODE_LEN: usize = 8;

/// Shop user, created on first contact from the chat front-end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Chat platform id (unique)
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Spendable balance, never negative
    pub wallet_balance: Decimal,
    /// Sum of everything ever debited for purchases
    pub total_spent: Decimal,
    /// This user's own invite code (unique)
    pub referral_code: String,
    pub referred_by: Option<UserId>,
    pub total_referrals: i32,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

/// Profile fields supplied by the chat layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Insert payload for a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub telegram_id: i64,
    pub profile: UserProfile,
    pub referral_code: String,
    pub referred_by: Option<UserId>,
}
