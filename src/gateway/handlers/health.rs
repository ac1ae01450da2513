//! Health check handler

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use super::super::state::AppState;
use super::super::types::{ApiResponse, error_codes};

/// Only ping the store once per interval
const CHECK_INTERVAL_MS: u64 = 5000;

static LAST_CHECK_MS: AtomicU64 = AtomicU64::new(0);
static LAST_HEALTHY: AtomicBool = AtomicBool::new(true);

/// Health check response data
#[derive(Serialize)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    pub timestamp_ms: u64,
    pub uptime_secs: u64,
    pub version: &'static str,
}

/// GET /api/v1/health
///
/// Internally pings the store but does NOT expose any internal details.
///
/// - Healthy: 200 OK + {code: 0, data: {timestamp_ms, ...}}
/// - Unhealthy: 503 Service Unavailable + {code: 5001, msg: "unavailable"}
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let last_check = LAST_CHECK_MS.load(Ordering::Relaxed);
    let healthy = if now_ms.saturating_sub(last_check) > CHECK_INTERVAL_MS {
        LAST_CHECK_MS.store(now_ms, Ordering::Relaxed);
        let ok = match state.store.ping().await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(error = %e, "[HEALTH] store ping failed");
                false
            }
        };
        LAST_HEALTHY.store(ok, Ordering::Relaxed);
        ok
    } else {
        LAST_HEALTHY.load(Ordering::Relaxed)
    };

    if healthy {
        (
            StatusCode::OK,
            Json(ApiResponse::success(HealthResponse {
                timestamp_ms: now_ms,
                uptime_secs: state.uptime().as_secs(),
                version: env!("BUILD_VERSION"),
            })),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                code: error_codes::SERVICE_UNAVAILABLE,
                msg: "unavailable".to_string(),
                error: Some("SERVICE_UNAVAILABLE"),
                data: None,
            }),
        )
    }
}
