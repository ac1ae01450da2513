//! Shop users and their wallets

pub mod models;
pub mod service;
pub mod wallet;

pub use models::{NewUser, REFERRAL_CODE_LEN, User, UserProfile};
pub use service::{AccountError, UserService, generate_referral_code};
pub use wallet::{WalletAccount, WalletError};
