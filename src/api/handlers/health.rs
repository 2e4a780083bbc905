//! Health check endpoints for monitoring and readiness probes

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::routes::ApiState;
use crate::observability::SecretsHealth;

/// Banner served at `/`
pub async fn root_handler() -> &'static str {
    "Secret lifecycle service is running"
}

/// Secret lifecycle part of the health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsHealthBody {
    pub status: String,
    pub cached_secrets: usize,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok`, `degraded` (serving stale values) or `unhealthy` (nothing loaded)
    pub status: String,
    pub secrets: SecretsHealthBody,
}

/// Health check endpoint
///
/// Returns 200 while secrets are being served, even stale ones, and 503
/// when nothing has loaded yet.
pub async fn health_handler(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    let health =
        SecretsHealth::from_status(&state.manager.status(), state.manager.cache().len());
    let status_code = if health.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let status = health.status.as_str().to_string();
    let body = HealthResponse {
        status: status.clone(),
        secrets: SecretsHealthBody {
            status,
            cached_secrets: health.cached_secrets,
            last_refresh_at: health.last_refresh_at,
            last_error: health.last_error,
        },
    };

    (status_code, Json(body))
}
