//! Payment gateway adapter
//!
//! Amounts cross this boundary as whole Toman (`i64`); the gateway must
//! see the same integer on request and on verify.

use async_trait::async_trait;
use thiserror::Error;

/// Gateway accepted the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    /// Opaque token echoed back on the callback
    pub authority: String,
    /// Page the user is sent to
    pub redirect_url: String,
}

/// Gateway confirmed the money
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReceipt {
    pub reference_id: String,
    /// Gateway reported the payment was verified before
    pub already_verified: bool,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Explicit, final refusal
    #[error("Gateway rejected (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Gateway timed out")]
    Timeout,

    /// Request may or may not have reached the gateway
    #[error("Gateway transport error: {0}")]
    Transport(String),
}

impl GatewayError {
    /// Whether the gateway gave a definitive answer. Anything else leaves
    /// the outcome unknown and must be retried, not recorded as failure.
    pub fn is_definitive(&self) -> bool {
        matches!(self, GatewayError::Rejected { .. })
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Adapter name for logging
    fn name(&self) -> &'static str;

    /// Open a payment intent for `amount` Toman.
    async fn request_payment(
        &self,
        amount: i64,
        description: &str,
        callback_url: &str,
    ) -> Result<PaymentIntent, GatewayError>;

    /// Confirm the intent identified by `authority` for exactly `amount`.
    async fn verify_payment(
        &self,
        amount: i64,
        authority: &str,
    ) -> Result<VerifyReceipt, GatewayError>;
}

/// In-process gateway for sandbox runs and tests
#[cfg(any(test, feature = "mock-api"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    /// Scripted outcome for the next calls
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MockOutcome {
        Accept,
        Reject,
        Timeout,
    }

    struct Intent {
        amount: i64,
        verified_ref: Option<String>,
    }

    pub struct MockGateway {
        intents: Mutex<HashMap<String, Intent>>,
        request_outcome: Mutex<MockOutcome>,
        verify_outcome: Mutex<MockOutcome>,
        delay: Mutex<Option<Duration>>,
        seq: AtomicU64,
        request_count: AtomicUsize,
        verify_count: AtomicUsize,
    }

    impl Default for MockGateway {
        fn default() -> Self {
            Self {
                intents: Mutex::new(HashMap::new()),
                request_outcome: Mutex::new(MockOutcome::Accept),
                verify_outcome: Mutex::new(MockOutcome::Accept),
                delay: Mutex::new(None),
                seq: AtomicU64::new(0),
                request_count: AtomicUsize::new(0),
                verify_count: AtomicUsize::new(0),
            }
        }
    }

    impl MockGateway {
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn set_request_outcome(&self, outcome: MockOutcome) {
            *self.request_outcome.lock().await = outcome;
        }

        pub async fn set_verify_outcome(&self, outcome: MockOutcome) {
            *self.verify_outcome.lock().await = outcome;
        }

        /// Sleep before answering (to exercise caller-side timeouts).
        pub async fn set_delay(&self, delay: Option<Duration>) {
            *self.delay.lock().await = delay;
        }

        pub fn request_count(&self) -> usize {
            self.request_count.load(Ordering::SeqCst)
        }

        pub fn verify_count(&self) -> usize {
            self.verify_count.load(Ordering::SeqCst)
        }

        async fn pause(&self) {
            let delay = *self.delay.lock().await;
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn request_payment(
            &self,
            amount: i64,
            _description: &str,
            _callback_url: &str,
        ) -> Result<PaymentIntent, GatewayError> {
            self.request_count.fetch_add(1, Ordering::SeqCst);
            self.pause().await;

            match *self.request_outcome.lock().await {
                MockOutcome::Reject => Err(GatewayError::Rejected {
                    code: -9,
                    message: "Mock request rejected".to_string(),
                }),
                MockOutcome::Timeout => Err(GatewayError::Timeout),
                MockOutcome::Accept => {
                    let n = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
                    let authority = format!("A{:035}", n);
                    self.intents.lock().await.insert(
                        authority.clone(),
                        Intent {
                            amount,
                            verified_ref: None,
                        },
                    );
                    Ok(PaymentIntent {
                        redirect_url: format!("https://sandbox.gateway.test/StartPay/{}", authority),
                        authority,
                    })
                }
            }
        }

        async fn verify_payment(
            &self,
            amount: i64,
            authority: &str,
        ) -> Result<VerifyReceipt, GatewayError> {
            self.verify_count.fetch_add(1, Ordering::SeqCst);
            self.pause().await;

            match *self.verify_outcome.lock().await {
                MockOutcome::Reject => {
                    return Err(GatewayError::Rejected {
                        code: -51,
                        message: "Mock payment declined".to_string(),
                    });
                }
                MockOutcome::Timeout => return Err(GatewayError::Timeout),
                MockOutcome::Accept => {}
            }

            let mut intents = self.intents.lock().await;
            let Some(intent) = intents.get_mut(authority) else {
                return Err(GatewayError::Rejected {
                    code: -54,
                    message: "Invalid authority".to_string(),
                });
            };
            if intent.amount != amount {
                return Err(GatewayError::Rejected {
                    code: -50,
                    message: "Amount mismatch".to_string(),
                });
            }
            if let Some(reference_id) = &intent.verified_ref {
                return Ok(VerifyReceipt {
                    reference_id: reference_id.clone(),
                    already_verified: true,
                });
            }
            let reference_id = format!("{}", 100_000 + self.seq.fetch_add(1, Ordering::SeqCst));
            intent.verified_ref = Some(reference_id.clone());
            Ok(VerifyReceipt {
                reference_id,
                already_verified: false,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_roundtrip_and_replay() {
            let gw = MockGateway::new();
            let intent = gw.request_payment(50_000, "topup", "cb").await.unwrap();

            let first = gw.verify_payment(50_000, &intent.authority).await.unwrap();
            assert!(!first.already_verified);
            let second = gw.verify_payment(50_000, &intent.authority).await.unwrap();
            assert!(second.already_verified);
            assert_eq!(first.reference_id, second.reference_id);
        }

        #[tokio::test]
        async fn test_mock_amount_tampering_rejected() {
            let gw = MockGateway::new();
            let intent = gw.request_payment(50_000, "topup", "cb").await.unwrap();
            let err = gw.verify_payment(5_000_000, &intent.authority).await.unwrap_err();
            assert!(err.is_definitive());
        }

        #[tokio::test]
        async fn test_mock_timeout_is_not_definitive() {
            let gw = MockGateway::new();
            gw.set_request_outcome(MockOutcome::Timeout).await;
            let err = gw.request_payment(1_000, "x", "cb").await.unwrap_err();
            assert!(!err.is_definitive());
            assert_eq!(gw.request_count(), 1);
        }
    }
}
