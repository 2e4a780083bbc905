//! # Vigil
//!
//! Vigil keeps a small set of externally managed secrets (application config
//! and database credentials) valid in memory while the upstream secret store
//! rotates them out-of-band.
//!
//! ## Architecture
//!
//! ```text
//! Secret Store ──► SecretManager ──► SecretCache ──► consumers (HTTP, pools)
//!                   ▲         ▲
//!          refresh timer   drift poller
//! ```
//!
//! - **Refresh timer**: one-shot, armed just after the store's next rotation,
//!   re-armed after every refresh
//! - **Drift poller**: fixed-interval metadata check catching manual rotations
//! - **Critical section**: both triggers, and manual refreshes, run the same
//!   guarded fetch → replace → record rotation → rearm sequence
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use vigil::{config::AppConfig, startup::start_secret_manager, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let manager = start_secret_manager(&config.secrets).await?;
//!     if let Some(api_key) = manager.cache().get("API_KEY") {
//!         println!("loaded {}", api_key); // prints the redaction marker
//!     }
//!     manager.shutdown();
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod observability;
pub mod secrets;
pub mod startup;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result};
pub use secrets::{SecretCache, SecretManager, SecureValue};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
