//! Secret lifecycle management.
//!
//! Keeps a small set of externally managed secrets valid in memory while the
//! upstream store rotates them out-of-band.
//!
//! # Architecture
//!
//! - [`SecretStoreClient`]: adapter over the external store (value and
//!   rotation metadata fetches)
//! - [`SecretCache`]: current [`SecretSet`] per [`SecretGroup`], read without
//!   blocking or fetching
//! - [`RefreshTimer`] and [`RefreshPolicy`]: a self-rescheduling one-shot
//!   timer aimed just after the store's next rotation
//! - drift poller: fixed-interval metadata check that catches rotations the
//!   timer did not expect
//! - [`SecretManager`]: owns all of the above; every refresh runs through its
//!   single guarded refresh-and-rearm operation
//!
//! # Supported Backends
//!
//! - **Environment Variables**: development store using `VIGIL_SECRET_*`
//! - **In-Memory**: programmable store for tests and local runs
//! - **AWS Secrets Manager**: behind the `aws` feature
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vigil::secrets::{EnvSecretStore, LifecycleSettings, SecretManager};
//!
//! let manager = SecretManager::new(Arc::new(EnvSecretStore::new()), LifecycleSettings::default());
//! manager.start().await?;
//!
//! if let Some(password) = manager.cache().get("password") {
//!     connect(password.reveal());
//! }
//!
//! // Administrative refresh outside the normal cycle
//! manager.trigger_immediate_refresh().await?;
//! ```
//!
//! # Security Considerations
//!
//! - [`SecureValue`] renders as `[SECURE_SECRET]` in Debug, Display and JSON
//! - Secret values are never logged; logs carry names, key counts and timestamps
//! - Raw values for the debug surface go through [`SecretCache::reveal_for_debug`]

#[cfg(feature = "aws")]
pub mod aws;
pub mod cache;
pub mod client;
pub mod env;
pub mod error;
pub mod manager;
pub mod memory;
pub mod poller;
pub mod rotation;
pub mod scheduler;
pub mod types;

// Re-export main types
#[cfg(feature = "aws")]
pub use aws::AwsSecretStore;
pub use cache::SecretCache;
pub use client::SecretStoreClient;
pub use env::EnvSecretStore;
pub use error::{Result, SecretsError};
pub use manager::{
    LifecycleSettings, RefreshReport, RefreshStatus, RefreshTrigger, SecretManager,
};
pub use memory::InMemorySecretStore;
pub use poller::DriftOutcome;
pub use rotation::RotationState;
pub use scheduler::{
    ArmedTimer, RefreshPolicy, RefreshTimer, ScheduleDecision, ScheduleReason,
    ScheduledRefreshHandle, SchedulerState,
};
pub use types::{
    parse_secret_payload, RotationMetadata, SecretGroup, SecretLocation, SecretSet, SecureValue,
    REDACTION_MARKER,
};
