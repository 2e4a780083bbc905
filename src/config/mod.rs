//! # Configuration Management
//!
//! Environment-driven configuration for the vigil service. `.env` files are
//! loaded by the binary with `dotenvy` before [`AppConfig::from_env`] runs.

pub mod settings;

pub use settings::{
    AppConfig, DebugConfig, ObservabilityConfig, SecretBackendKind, SecretsConfig, ServerConfig,
};
