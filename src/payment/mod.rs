//! Payment FSM
//!
//! Moves money into the system: wallet payments for pending orders and
//! gateway round-trips for top-ups and card-paid orders.
//!
//! # State Machine
//!
//! ```text
//! PENDING ──► VERIFYING ──► COMPLETED
//!    │            │
//!    │            ├──► FAILED
//!    │            └──► CANCELLED
//!    ├──► COMPLETED   (wallet, one step)
//!    └──► FAILED      (gateway refused or never answered)
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Persist-Before-Call**: the PENDING row exists before the gateway is asked
//! 2. **Confirmed-Only VERIFYING**: VERIFYING is entered only after the gateway accepted
//! 3. **Explicit Fail Rule**: a verify timeout never fails a payment, it stays VERIFYING
//! 4. **Idempotency**: verifying a terminal payment returns it unchanged

pub mod error;
pub mod gateway;
pub mod service;
pub mod state;
pub mod types;
pub mod worker;
pub mod zarinpal;

pub use error::PaymentError;
pub use gateway::{GatewayError, PaymentGateway, PaymentIntent, VerifyReceipt};
pub use service::PaymentService;
pub use state::{OpResult, PaymentStatus};
pub use types::{ChargeContext, ChargeRequest, NewPayment, Payment, PaymentResult};
pub use worker::{RecoveryWorker, WorkerConfig};
pub use zarinpal::ZarinpalClient;
