//! Debug/admin endpoints over the secret lifecycle.
//!
//! Values are shown through [`SecureValue`] serialization, so listings only
//! ever contain the redaction marker. Raw values require the separate reveal
//! route, which is off unless explicitly enabled.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::secrets::{RefreshReport, RefreshStatus, SchedulerState, SecureValue};

/// Snapshot of the cached secrets and lifecycle state
#[derive(Debug, Serialize)]
pub struct EnvSecretsResponse {
    pub backend: &'static str,
    /// Group name to logical name to redacted value
    pub groups: BTreeMap<String, BTreeMap<String, SecureValue>>,
    pub last_known_rotation: Option<DateTime<Utc>>,
    pub scheduler: SchedulerState,
    pub refresh: RefreshStatus,
}

pub async fn env_secrets_handler(State(state): State<ApiState>) -> Json<EnvSecretsResponse> {
    let groups = state
        .manager
        .cache()
        .snapshot()
        .into_iter()
        .map(|(group, set)| {
            let values: BTreeMap<String, SecureValue> =
                set.iter().map(|(name, value)| (name.to_string(), value.clone())).collect();
            (group.to_string(), values)
        })
        .collect();

    Json(EnvSecretsResponse {
        backend: state.manager.backend_name(),
        groups,
        last_known_rotation: state.manager.rotation_state().last_known_rotation(),
        scheduler: state.manager.scheduler_state(),
        refresh: state.manager.status(),
    })
}

#[derive(Debug, Serialize)]
pub struct RefreshSuccess {
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub report: Option<RefreshReport>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshFailure {
    pub error: String,
    pub details: String,
    pub kind: String,
}

/// Force a full refresh and rearm; waits behind any refresh already running
pub async fn refresh_secrets_handler(State(state): State<ApiState>) -> Response {
    match state.manager.trigger_immediate_refresh().await {
        Ok(report) => {
            info!(refreshed = report.refreshed.len(), "Manual secret refresh completed");
            let body = RefreshSuccess {
                message: "Secrets refreshed successfully".to_string(),
                timestamp: report.completed_at,
                report: Some(report),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => {
            error!(error = %err, kind = err.kind(), "Manual secret refresh failed");
            let body = RefreshFailure {
                error: "Failed to refresh secrets".to_string(),
                details: err.to_string(),
                kind: err.kind().to_string(),
            };
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RevealResponse {
    pub name: String,
    pub value: String,
}

/// Raw value of one cached secret
pub async fn reveal_secret_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<RevealResponse>, ApiError> {
    if !state.debug.allow_reveal {
        return Err(ApiError::forbidden("Secret reveal is disabled"));
    }

    let value = state
        .manager
        .cache()
        .reveal_for_debug(&name)
        .ok_or_else(|| ApiError::not_found(format!("No cached secret named '{}'", name)))?;

    Ok(Json(RevealResponse { name, value }))
}
