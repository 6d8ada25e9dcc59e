//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use tracing::error;

use super::super::state::AppState;
use super::super::types::HealthResponse;

fn status(up: bool) -> String {
    if up { "UP" } else { "DOWN" }.to_string()
}

/// Health check endpoint
///
/// Probes the account store and the lock store concurrently.
///
/// - Healthy: 200 OK
/// - Either store unreachable: 503 Service Unavailable
#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "A backing store is unreachable", body = HealthResponse)
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (accounts, locks) = tokio::join!(
        state.account_store.health_check(),
        state.lock_store.health_check()
    );

    if let Err(e) = &accounts {
        error!(error = %e, "[HEALTH] account store ping failed");
    }
    if let Err(e) = &locks {
        error!(store = state.lock_store.name(), error = %e, "[HEALTH] lock store ping failed");
    }

    let healthy = accounts.is_ok() && locks.is_ok();
    let body = HealthResponse {
        status: status(healthy),
        account_store: status(accounts.is_ok()),
        lock_store: status(locks.is_ok()),
        version: env!("GIT_HASH").to_string(),
    };
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(body))
}
