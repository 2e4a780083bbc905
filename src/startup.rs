//! Startup sequence for the vigil service
//!
//! Builds the configured secret store and the lifecycle manager, and runs the
//! initial load before the HTTP surface comes up.

use crate::config::{SecretBackendKind, SecretsConfig};
use crate::errors::{Error, Result};
use crate::secrets::{EnvSecretStore, SecretManager, SecretStoreClient};
use std::sync::Arc;
use tracing::info;

/// Build the store named by `VIGIL_SECRET_BACKEND`
pub fn build_secret_store(config: &SecretsConfig) -> Result<Arc<dyn SecretStoreClient>> {
    let store: Arc<dyn SecretStoreClient> = match config.backend {
        SecretBackendKind::Env => Arc::new(EnvSecretStore::new()),
        #[cfg(feature = "aws")]
        SecretBackendKind::Aws => Arc::new(crate::secrets::AwsSecretStore::new()),
        #[cfg(not(feature = "aws"))]
        SecretBackendKind::Aws => {
            return Err(Error::config(
                "VIGIL_SECRET_BACKEND=aws requires building with the `aws` feature",
            ));
        }
    };

    info!(backend = store.backend_name(), "Secret store initialized");
    Ok(store)
}

/// Build the manager and run the initial load, timer arm and poller start
pub async fn start_secret_manager(config: &SecretsConfig) -> Result<SecretManager> {
    let store = build_secret_store(config)?;
    let manager = SecretManager::new(store, config.lifecycle_settings());
    manager.start().await?;

    info!(
        cached_secrets = manager.cache().len(),
        scheduler = ?manager.scheduler_state(),
        "Secret lifecycle manager started"
    );
    Ok(manager)
}
