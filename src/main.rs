//! permia-core service
//!
//! ```text
//! ┌──────────┐    ┌──────────────┐    ┌───────────┐
//! │  Chat /  │───▶│ HTTP gateway │───▶│   Store   │
//! │  Admin   │    │   (axum)     │    │ (PG/mem)  │
//! └──────────┘    └──────┬───────┘    └───────────┘
//!                        │
//!               ┌────────┴────────┐
//!               ▼                 ▼
//!        Payment gateway     Card issuer
//!          (Zarinpal)        (Brocard)
//! ```
//!
//! Usage: `permia-core [--env dev|prod] [--port N]`

use std::sync::Arc;

use anyhow::{Context, Result};

use permia_core::card_issuer::{BrocardClient, CardIssuer};
use permia_core::config::AppConfig;
use permia_core::db::Database;
use permia_core::gateway::{self, AppState};
use permia_core::payment::{PaymentGateway, RecoveryWorker, WorkerConfig, ZarinpalClient};
use permia_core::store::{MemoryStore, PgStore, Store};

fn get_env() -> String {
    arg_value(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

fn get_port_override() -> Option<u16> {
    arg_value(&["--port"]).and_then(|p| p.parse().ok())
}

fn arg_value(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    args.windows(2)
        .find(|w| names.contains(&w[0].as_str()))
        .map(|w| w[1].clone())
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn Store>> {
    match &config.postgres_url {
        Some(url) => {
            let db = Database::connect(url)
                .await
                .context("Failed to connect to PostgreSQL")?;
            if !db.schema_ready().await? {
                anyhow::bail!("Schema missing: apply migrations/0001_init.sql first");
            }
            Ok(Arc::new(PgStore::new(db.pool().clone())))
        }
        None => {
            tracing::warn!("No postgres_url configured, using in-memory store (data is lost on exit)");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn payment_gateway(config: &AppConfig) -> Result<Arc<dyn PaymentGateway>> {
    if config.payment_gateway.sandbox {
        #[cfg(feature = "mock-api")]
        {
            tracing::warn!("Payment gateway in sandbox mode (mock)");
            return Ok(Arc::new(permia_core::payment::gateway::mock::MockGateway::new()));
        }
        #[cfg(not(feature = "mock-api"))]
        anyhow::bail!("payment_gateway.sandbox requires the mock-api feature");
    }
    Ok(Arc::new(ZarinpalClient::new(&config.payment_gateway)?))
}

fn card_issuer(config: &AppConfig) -> Result<Arc<dyn CardIssuer>> {
    if config.card_issuer.sandbox {
        #[cfg(feature = "mock-api")]
        {
            tracing::warn!("Card issuer in sandbox mode (mock)");
            return Ok(Arc::new(permia_core::card_issuer::mock::MockCardIssuer::new()));
        }
        #[cfg(not(feature = "mock-api"))]
        anyhow::bail!("card_issuer.sandbox requires the mock-api feature");
    }
    Ok(Arc::new(BrocardClient::new(&config.card_issuer)?))
}

#[tokio::main]
async fn main() -> Result<()> {
    let env = get_env();
    let mut config = AppConfig::load(&env).context("Failed to load configuration")?;
    if let Some(port) = get_port_override() {
        config.gateway.port = port;
    }
    let _log_guard = permia_core::logging::init_logging(&config);

    tracing::info!(env = %env, version = env!("BUILD_VERSION"), "Starting permia-core");

    let store = open_store(&config).await?;
    let state = Arc::new(AppState::build(
        store.clone(),
        payment_gateway(&config)?,
        card_issuer(&config)?,
        &config,
    ));

    if config.recovery.enabled {
        let worker = RecoveryWorker::new(
            store,
            state.payments.clone(),
            WorkerConfig::from(&config.recovery),
        );
        tokio::spawn(async move { worker.run().await });
    }

    gateway::serve(&config.gateway, state)
        .await
        .context("HTTP gateway stopped")?;
    Ok(())
}
