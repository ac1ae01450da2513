//! Card-issuing provider
//!
//! Private product types are fulfilled by minting a prepaid virtual card
//! the buyer uses to pay for their own account.

pub mod brocard;

pub use brocard::BrocardClient;

use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CardIssuerError {
    /// Provider answered and refused
    #[error("Card issuer rejected request: {0}")]
    Rejected(String),

    #[error("Card issuer timed out")]
    Timeout,

    #[error("Card issuer transport error: {0}")]
    Transport(String),

    #[error("Card issuer misconfigured: {0}")]
    Config(String),
}

/// Freshly issued card. `Debug` masks the secrets.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct IssuedCard {
    pub card_id: String,
    pub pan: String,
    pub cvv: String,
    /// MM/YY
    pub expiry: String,
}

impl IssuedCard {
    /// `**** **** **** 1234`
    pub fn masked_pan(&self) -> String {
        let tail: String = self
            .pan
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("**** **** **** {}", tail)
    }

    /// Delivery text shown to the buyer.
    pub fn delivery_text(&self) -> String {
        format!(
            "Card: {}\nCVV: {}\nExpiry: {}",
            self.pan, self.cvv, self.expiry
        )
    }
}

impl fmt::Debug for IssuedCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCard")
            .field("card_id", &self.card_id)
            .field("pan", &self.masked_pan())
            .field("cvv", &"***")
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[async_trait]
pub trait CardIssuer: Send + Sync {
    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Mint a card loaded with `amount`.
    async fn issue_card(
        &self,
        amount: Decimal,
        card_type: &str,
    ) -> Result<IssuedCard, CardIssuerError>;
}

/// In-process issuer for sandbox runs and tests
#[cfg(any(test, feature = "mock-api"))]
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    pub struct MockCardIssuer {
        issued: AtomicUsize,
        fail: AtomicBool,
    }

    impl MockCardIssuer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn issued_count(&self) -> usize {
            self.issued.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CardIssuer for MockCardIssuer {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn issue_card(
            &self,
            _amount: Decimal,
            _card_type: &str,
        ) -> Result<IssuedCard, CardIssuerError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(CardIssuerError::Rejected("Mock issue failure".to_string()));
            }
            let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(IssuedCard {
                card_id: format!("mock-{}", n),
                pan: format!("4111111111{:06}", n),
                cvv: format!("{:03}", n % 1000),
                expiry: "12/30".to_string(),
            })
        }
    }
}
