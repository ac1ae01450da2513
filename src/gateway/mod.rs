//! HTTP surface
//!
//! Thin axum layer over the core services. Every response uses the
//! `{code, msg, data}` envelope.

pub mod handlers;
pub mod state;
pub mod types;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::config::GatewayConfig;
use handlers::{coupons, health, orders, payments, users};
pub use state::AppState;

/// Build the `/api/v1` router.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/health", get(health::health_check))
        // Orders
        .route("/orders/purchase", post(orders::purchase))
        .route("/orders", post(orders::place_order).get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        // Payments
        .route("/payments/charge", post(payments::charge))
        .route("/payments/verify", post(payments::verify))
        .route("/payments/callback", get(payments::callback))
        .route("/payments/{id}", get(payments::get_payment))
        // Coupons
        .route("/coupons/validate", post(coupons::validate))
        // Users
        .route("/users", post(users::get_or_create))
        .route("/users/{user_id}/balance", get(users::balance))
        .route("/users/{user_id}/orders", get(orders::user_orders))
        .route("/users/{user_id}/coupons", get(coupons::user_coupons));

    Router::new().nest("/api/v1", api).with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: &GatewayConfig, state: Arc<AppState>) -> std::io::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "HTTP gateway listening");
    axum::serve(listener, router(state)).await
}
