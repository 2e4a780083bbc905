//! # Structured Logging
//!
//! `tracing-subscriber` setup with an env filter and optional JSON output.
//! `RUST_LOG` takes precedence over the configured log level.

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{Error, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter from `RUST_LOG`, falling back to the configured level
pub fn env_filter(config: &ObservabilityConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.log_level).map_err(|e| {
        Error::config(format!("Invalid log level '{}': {}", config.log_level, e))
    })
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed; callers that may initialise
/// twice (tests) can ignore that error.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logging {
        registry
            .with(fmt::layer().json().with_current_span(true).with_target(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    result.map_err(|e| Error::internal(format!("Failed to initialize logging: {}", e)))
}

/// Log configuration at startup. Secret values never appear here.
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        server_address = %config.server.bind_address(),
        secret_backend = %config.secrets.backend,
        app_secret = %config.secrets.app_secret_name,
        db_secret = %config.secrets.db_secret_name,
        rotation_tracked = %config.secrets.rotation_tracked,
        poll_interval_secs = config.secrets.poll_interval_seconds,
        grace_period_ms = config.secrets.grace_period_ms,
        fallback_delay_secs = config.secrets.fallback_delay_seconds,
        metrics_enabled = config.observability.enable_metrics,
        debug_routes = config.debug.enable_routes,
        debug_reveal = config.debug.allow_reveal,
        "vigil configuration"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_log_level_is_config_error() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config =
            ObservabilityConfig { log_level: "vigil=notalevel".to_string(), ..Default::default() };
        assert!(matches!(env_filter(&config), Err(Error::Config { .. })));
    }

    #[test]
    fn test_valid_log_level() {
        let config = ObservabilityConfig { log_level: "vigil=debug".to_string(), ..Default::default() };
        assert!(env_filter(&config).is_ok());
    }

    #[test]
    fn test_double_init_is_an_error_not_a_panic() {
        let config = ObservabilityConfig::default();
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }
}
