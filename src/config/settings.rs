//! # Configuration Settings
//!
//! Defines the configuration structure for the vigil service. Every value is
//! read from the environment once at startup and validated before the secret
//! lifecycle starts; nothing is re-validated per refresh cycle.

use crate::errors::{Error, Result};
use crate::secrets::{LifecycleSettings, RefreshPolicy, SecretGroup, SecretLocation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    /// HTTP server configuration
    #[validate(nested)]
    pub server: ServerConfig,

    /// Secret store and lifecycle configuration
    #[validate(nested)]
    pub secrets: SecretsConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Debug surface configuration
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Read every section from the environment and validate the result
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server: ServerConfig::from_env()?,
            secrets: SecretsConfig::from_env()?,
            observability: ObservabilityConfig::from_env()?,
            debug: DebugConfig::from_env(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()?;
        Ok(())
    }

    /// Cross-field rules the validator crate cannot express
    fn validate_custom(&self) -> Result<()> {
        if self.observability.enable_metrics && self.observability.metrics_port == self.server.port
        {
            return Err(Error::validation("Server and metrics ports cannot be the same"));
        }

        if self.secrets.overdue_delay_seconds > self.secrets.fallback_delay_seconds {
            return Err(Error::validation_field(
                "Overdue delay cannot exceed the fallback delay",
                "overdue_delay_seconds",
            ));
        }

        if self.secrets.app_secret_name == self.secrets.db_secret_name
            && self.secrets.app_secret_region == self.secrets.db_secret_region
        {
            return Err(Error::validation(
                "Application and database secrets must be different store secrets",
            ));
        }

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Server bind address
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    /// Server port
    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 3000 }
    }
}

impl ServerConfig {
    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Create ServerConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: env_string(&["VIGIL_HOST"], &defaults.host),
            port: env_parse(&["VIGIL_PORT", "PORT"], defaults.port)?,
        })
    }
}

/// Which secret store implementation to build at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretBackendKind {
    /// `VIGIL_SECRET_*` environment variables
    Env,
    /// AWS Secrets Manager (requires the `aws` feature)
    Aws,
}

impl FromStr for SecretBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "env" => Ok(Self::Env),
            "aws" => Ok(Self::Aws),
            other => Err(format!("Unknown secret backend '{}' (expected env or aws)", other)),
        }
    }
}

impl fmt::Display for SecretBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Env => "env",
            Self::Aws => "aws",
        })
    }
}

/// Secret store and lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SecretsConfig {
    pub backend: SecretBackendKind,

    /// Store secret holding the application configuration
    #[validate(length(min = 1, message = "Application secret name cannot be empty"))]
    pub app_secret_name: String,

    #[validate(length(min = 1, message = "Application secret region cannot be empty"))]
    pub app_secret_region: String,

    /// Store secret holding the database credentials
    #[validate(length(min = 1, message = "Database secret name cannot be empty"))]
    pub db_secret_name: String,

    #[validate(length(min = 1, message = "Database secret region cannot be empty"))]
    pub db_secret_region: String,

    /// Group whose rotation metadata drives the scheduler and drift poller
    pub rotation_tracked: SecretGroup,

    #[validate(range(
        min = 1,
        max = 3600,
        message = "Poll interval must be between 1 and 3600 seconds"
    ))]
    pub poll_interval_seconds: u64,

    #[validate(range(max = 600000, message = "Grace period must be at most 600000 ms"))]
    pub grace_period_ms: u64,

    #[validate(range(
        min = 1,
        max = 86400,
        message = "Fallback delay must be between 1 and 86400 seconds"
    ))]
    pub fallback_delay_seconds: u64,

    #[validate(range(
        min = 1,
        max = 3600,
        message = "Overdue delay must be between 1 and 3600 seconds"
    ))]
    pub overdue_delay_seconds: u64,

    /// Refuse to start when the first load fails
    pub require_initial_load: bool,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            backend: SecretBackendKind::Env,
            app_secret_name: "employee-api-secrets".to_string(),
            app_secret_region: "us-west-2".to_string(),
            db_secret_name: "employee-api-db-credentials".to_string(),
            db_secret_region: "us-west-2".to_string(),
            rotation_tracked: SecretGroup::Database,
            poll_interval_seconds: 15,
            grace_period_ms: 1000,
            fallback_delay_seconds: 300,
            overdue_delay_seconds: 10,
            require_initial_load: false,
        }
    }
}

impl SecretsConfig {
    /// Create SecretsConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let app_secret_region = env_string(&["VIGIL_APP_SECRET_REGION"], &defaults.app_secret_region);
        // The database secret lives next to the application secret unless told otherwise.
        let db_secret_region = env_string(&["VIGIL_DB_SECRET_REGION"], &app_secret_region);

        Ok(Self {
            backend: env_parse(&["VIGIL_SECRET_BACKEND"], defaults.backend)?,
            app_secret_name: env_string(
                &["VIGIL_APP_SECRET_NAME", "AWS_SECRET_NAME"],
                &defaults.app_secret_name,
            ),
            app_secret_region,
            db_secret_name: env_string(&["VIGIL_DB_SECRET_NAME"], &defaults.db_secret_name),
            db_secret_region,
            rotation_tracked: env_parse(&["VIGIL_ROTATION_TRACKED"], defaults.rotation_tracked)?,
            poll_interval_seconds: env_parse(
                &["VIGIL_POLL_INTERVAL_SECONDS"],
                defaults.poll_interval_seconds,
            )?,
            grace_period_ms: env_parse(&["VIGIL_GRACE_PERIOD_MS"], defaults.grace_period_ms)?,
            fallback_delay_seconds: env_parse(
                &["VIGIL_FALLBACK_DELAY_SECONDS"],
                defaults.fallback_delay_seconds,
            )?,
            overdue_delay_seconds: env_parse(
                &["VIGIL_OVERDUE_DELAY_SECONDS"],
                defaults.overdue_delay_seconds,
            )?,
            require_initial_load: env_bool("VIGIL_REQUIRE_INITIAL_LOAD", false),
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        RefreshPolicy {
            grace_period: Duration::from_millis(self.grace_period_ms),
            fallback_delay: Duration::from_secs(self.fallback_delay_seconds),
            overdue_delay: Duration::from_secs(self.overdue_delay_seconds),
        }
    }

    /// Convert into the lifecycle manager's settings
    pub fn lifecycle_settings(&self) -> LifecycleSettings {
        LifecycleSettings {
            app_config: SecretLocation::new(&self.app_secret_name, &self.app_secret_region),
            database: SecretLocation::new(&self.db_secret_name, &self.db_secret_region),
            rotation_tracked: self.rotation_tracked,
            policy: self.refresh_policy(),
            poll_interval: self.poll_interval(),
            require_initial_load: self.require_initial_load,
        }
    }
}

/// Observability configuration for logging and metrics
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus exporter
    pub enable_metrics: bool,

    /// Metrics server port (0 = disabled)
    pub metrics_port: u16,

    /// Service name attached to metrics
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enable_metrics: false,
            metrics_port: 9090,
            service_name: "vigil".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

impl ObservabilityConfig {
    /// Get metrics bind address (None if disabled)
    pub fn metrics_bind_address(&self) -> Option<String> {
        if self.metrics_port == 0 {
            None
        } else {
            Some(format!("0.0.0.0:{}", self.metrics_port))
        }
    }

    /// Create ObservabilityConfig from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            enable_metrics: env_bool("VIGIL_ENABLE_METRICS", defaults.enable_metrics),
            metrics_port: env_parse(&["VIGIL_METRICS_PORT"], defaults.metrics_port)?,
            service_name: env_string(&["VIGIL_SERVICE_NAME"], &defaults.service_name),
            log_level: env_string(&["VIGIL_LOG_LEVEL"], &defaults.log_level),
            json_logging: env_bool("VIGIL_JSON_LOGGING", defaults.json_logging),
        })
    }
}

/// Debug/admin surface configuration
///
/// Authentication of these routes is left to a reverse proxy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DebugConfig {
    /// Mount the `/debug` routes
    pub enable_routes: bool,

    /// Allow `/debug/secrets/{name}/reveal` to return raw values
    pub allow_reveal: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self { enable_routes: true, allow_reveal: false }
    }
}

impl DebugConfig {
    /// Create DebugConfig from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enable_routes: env_bool("VIGIL_DEBUG_ROUTES", defaults.enable_routes),
            allow_reveal: env_bool("VIGIL_DEBUG_REVEAL", defaults.allow_reveal),
        }
    }
}

/// First set variable among `names`.
fn env_lookup(names: &[&str]) -> Option<(String, String)> {
    names
        .iter()
        .find_map(|name| std::env::var(name).ok().map(|value| (name.to_string(), value)))
}

fn env_string(names: &[&str], default: &str) -> String {
    env_lookup(names).map(|(_, value)| value).unwrap_or_else(|| default.to_string())
}

fn env_parse<T>(names: &[&str], default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env_lookup(names) {
        Some((name, value)) => value
            .trim()
            .parse::<T>()
            .map_err(|e| Error::config(format!("Invalid value '{}' for {}: {}", value, name, e))),
        None => Ok(default),
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name).map(|s| s.to_lowercase() == "true" || s == "1").unwrap_or(default)
}
