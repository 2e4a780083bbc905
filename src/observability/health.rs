//! # Health Checking
//!
//! Derives service health from the secret lifecycle's latest refresh status.

use crate::secrets::RefreshStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Health status for a component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum HealthStatus {
    /// Latest refresh succeeded
    Healthy,
    /// Serving the last good values while refreshes fail
    Degraded { message: String },
    /// Nothing has ever loaded
    Unhealthy { message: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    /// Healthy or degraded
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "ok",
            HealthStatus::Degraded { .. } => "degraded",
            HealthStatus::Unhealthy { .. } => "unhealthy",
        }
    }
}

/// Health of the secret lifecycle
#[derive(Debug, Clone, Serialize)]
pub struct SecretsHealth {
    #[serde(flatten)]
    pub status: HealthStatus,
    pub cached_secrets: usize,
    pub last_refresh_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl SecretsHealth {
    pub fn from_status(status: &RefreshStatus, cached_secrets: usize) -> Self {
        let health = match (&status.last_success_at, &status.last_error) {
            (Some(_), None) => HealthStatus::Healthy,
            (Some(_), Some(err)) => HealthStatus::Degraded { message: err.clone() },
            (None, Some(err)) => HealthStatus::Unhealthy { message: err.clone() },
            (None, None) => {
                HealthStatus::Unhealthy { message: "secrets not loaded yet".to_string() }
            }
        };

        Self {
            status: health,
            cached_secrets,
            last_refresh_at: status.last_success_at,
            last_error: status.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_from_status() {
        let mut status = RefreshStatus::default();
        assert!(!SecretsHealth::from_status(&status, 0).status.is_operational());

        status.last_success_at = Some(Utc::now());
        let health = SecretsHealth::from_status(&status, 3);
        assert!(health.status.is_healthy());
        assert_eq!(health.status.as_str(), "ok");

        status.last_error = Some("store unavailable".to_string());
        let health = SecretsHealth::from_status(&status, 3);
        assert_eq!(health.status.as_str(), "degraded");
        assert!(health.status.is_operational());
    }

    #[test]
    fn test_health_serialization() {
        let status = RefreshStatus { last_success_at: Some(Utc::now()), ..Default::default() };
        let json = serde_json::to_value(SecretsHealth::from_status(&status, 2)).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["cached_secrets"], 2);
    }
}
