//! Health check endpoints
//!
//! - /health - Basic health check with the current time
//! - /health/ready - Readiness probe (checks the credential store)
//! - /health/live - Liveness probe (always OK while the process runs)

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use shopfront_shared::HealthStatus;
use tracing::error;

/// Probe response
#[derive(Debug, Serialize)]
pub struct ProbeResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<ProbeChecks>,
}

/// Individual dependency checks
#[derive(Debug, Serialize)]
pub struct ProbeChecks {
    pub store: CheckStatus,
}

/// Status of one dependency
#[derive(Debug, Serialize)]
pub struct CheckStatus {
    pub status: String,
    pub backend: String,
}

/// Basic health check endpoint
pub async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

/// Readiness probe
///
/// Returns 503 while the credential store cannot be reached. The failure
/// detail is logged, not returned.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ProbeResponse>, (StatusCode, Json<ProbeResponse>)> {
    let users = state.users();
    let healthy = match users.ping().await {
        Ok(()) => true,
        Err(e) => {
            error!(backend = users.backend_name(), "Readiness check failed: {}", e);
            false
        }
    };

    let response = ProbeResponse {
        status: if healthy { "ready" } else { "not_ready" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(ProbeChecks {
            store: CheckStatus {
                status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
                backend: users.backend_name().to_string(),
            },
        }),
    };

    if healthy {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}

/// Liveness probe
pub async fn liveness_check() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "alive".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
    })
}
