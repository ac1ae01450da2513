//! Recovery Worker
//!
//! Background worker that drives abandoned payments to a terminal state.
//!
//! A payment stuck in PENDING never got a confirmed gateway intent and is
//! failed. A payment stuck in VERIFYING lost its callback and is verified
//! again with the stored authority; the gateway answers "already verified"
//! if the user did pay.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::error::PaymentError;
use super::service::PaymentService;
use super::state::PaymentStatus;
use crate::config::RecoveryConfig;
use crate::store::Store;

/// Configuration for the recovery worker
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// How often to scan for stale payments
    pub scan_interval: Duration,
    /// How long a payment must be untouched to be considered stale
    pub stale_threshold: Duration,
    /// Maximum payments to process per scan
    pub batch_size: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self::from(&RecoveryConfig::default())
    }
}

impl From<&RecoveryConfig> for WorkerConfig {
    fn from(config: &RecoveryConfig) -> Self {
        Self {
            scan_interval: Duration::from_secs(config.scan_interval_secs.max(1)),
            stale_threshold: Duration::from_secs(config.stale_after_secs),
            batch_size: config.batch_size.max(1),
        }
    }
}

pub struct RecoveryWorker {
    store: Arc<dyn Store>,
    payments: Arc<PaymentService>,
    config: WorkerConfig,
}

impl RecoveryWorker {
    pub fn new(store: Arc<dyn Store>, payments: Arc<PaymentService>, config: WorkerConfig) -> Self {
        Self {
            store,
            payments,
            config,
        }
    }

    /// Run the recovery loop forever.
    pub async fn run(&self) -> ! {
        info!(
            scan_interval_secs = self.config.scan_interval.as_secs(),
            stale_threshold_secs = self.config.stale_threshold.as_secs(),
            "Starting payment recovery worker"
        );

        let mut ticker = tokio::time::interval(self.config.scan_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.scan_and_recover().await {
                error!(error = %e, "Recovery scan failed");
            }
        }
    }

    /// One scan. Returns how many payments reached a terminal state.
    pub async fn scan_and_recover(&self) -> Result<usize, PaymentError> {
        let stale_after = chrono::Duration::from_std(self.config.stale_threshold)
            .map_err(|e| PaymentError::Unexpected(format!("stale threshold: {}", e)))?;
        let stale = self
            .store
            .stale_payments(
                &[PaymentStatus::Pending, PaymentStatus::Verifying],
                Utc::now() - stale_after,
                self.config.batch_size,
            )
            .await?;

        if stale.is_empty() {
            debug!("No stale payments found");
            return Ok(0);
        }
        info!(count = stale.len(), "Found stale payments to recover");

        let mut recovered = 0;
        for payment in stale {
            let outcome = match payment.status {
                PaymentStatus::Pending => self.payments.expire_pending(payment.id).await,
                PaymentStatus::Verifying if payment.authority.is_none() => {
                    warn!(payment_id = payment.id, "VERIFYING payment without authority");
                    continue;
                }
                _ => self.payments.settle(payment.clone()).await,
            };

            match outcome {
                Ok(result) if result.status.is_terminal() => {
                    info!(
                        payment_id = payment.id,
                        old_status = %payment.status,
                        new_status = %result.status,
                        "Payment recovered"
                    );
                    recovered += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(payment_id = payment.id, error = %e, "Failed to recover payment");
                }
            }
        }

        if recovered > 0 {
            info!(count = recovered, "Recovered payments this scan");
        }
        Ok(recovered)
    }
}
