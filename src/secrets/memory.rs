//! In-memory secret store.
//!
//! A programmable store for tests, demos and local runs: values, rotation
//! metadata and failures are set directly, and every call is counted so
//! callers can assert how often the lifecycle manager reached the store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::client::SecretStoreClient;
use super::error::{Result, SecretsError};
use super::types::{RotationMetadata, SecretSet};

#[derive(Debug, Default)]
struct StoredSecret {
    values: HashMap<String, String>,
    metadata: Option<RotationMetadata>,
    value_failure: Option<SecretsError>,
    metadata_failure: Option<SecretsError>,
    value_fetches: usize,
    metadata_fetches: usize,
}

#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    secrets: Mutex<HashMap<String, StoredSecret>>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every value fetch, to widen race windows in tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn secrets(&self) -> MutexGuard<'_, HashMap<String, StoredSecret>> {
        self.secrets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the stored value of a secret.
    pub fn put_secret<I, K, V>(&self, name: &str, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.secrets().entry(name.to_string()).or_default().values = values;
    }

    /// Set the rotation metadata reported for a secret.
    pub fn set_metadata(&self, name: &str, metadata: RotationMetadata) {
        self.secrets().entry(name.to_string()).or_default().metadata = Some(metadata);
    }

    /// Forget the rotation metadata; later calls report `MetadataUnavailable`.
    pub fn clear_metadata(&self, name: &str) {
        if let Some(secret) = self.secrets().get_mut(name) {
            secret.metadata = None;
        }
    }

    /// Simulate the store rotating a secret: new value plus new timestamps.
    pub fn rotate<I, K, V>(
        &self,
        name: &str,
        pairs: I,
        rotated_at: DateTime<Utc>,
        next_rotation_at: Option<DateTime<Utc>>,
    ) where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.put_secret(name, pairs);
        self.set_metadata(name, RotationMetadata::new(Some(rotated_at), next_rotation_at));
    }

    /// Make value fetches for `name` fail until cleared with `None`.
    pub fn fail_value_fetches(&self, name: &str, error: Option<SecretsError>) {
        self.secrets().entry(name.to_string()).or_default().value_failure = error;
    }

    /// Make metadata fetches for `name` fail until cleared with `None`.
    pub fn fail_metadata_fetches(&self, name: &str, error: Option<SecretsError>) {
        self.secrets().entry(name.to_string()).or_default().metadata_failure = error;
    }

    pub fn value_fetches(&self, name: &str) -> usize {
        self.secrets().get(name).map(|s| s.value_fetches).unwrap_or(0)
    }

    pub fn metadata_fetches(&self, name: &str) -> usize {
        self.secrets().get(name).map(|s| s.metadata_fetches).unwrap_or(0)
    }

    /// Highest number of value fetches that were ever in flight at once.
    pub fn max_concurrent_value_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn load_value(&self, name: &str) -> Result<SecretSet> {
        let mut secrets = self.secrets();
        let secret = secrets.get_mut(name).ok_or_else(|| SecretsError::not_found(name))?;
        secret.value_fetches += 1;
        if let Some(err) = &secret.value_failure {
            return Err(err.clone());
        }
        Ok(SecretSet::from_pairs(secret.values.iter().map(|(k, v)| (k.clone(), v.clone()))))
    }
}

#[async_trait]
impl SecretStoreClient for InMemorySecretStore {
    async fn fetch_secret_value(&self, name: &str, _region: &str) -> Result<SecretSet> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let result = self.load_value(name);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn fetch_secret_metadata(&self, name: &str, _region: &str) -> Result<RotationMetadata> {
        let mut secrets = self.secrets();
        let secret = secrets.get_mut(name).ok_or_else(|| SecretsError::not_found(name))?;
        secret.metadata_fetches += 1;
        if let Some(err) = &secret.metadata_failure {
            return Err(err.clone());
        }
        secret
            .metadata
            .ok_or_else(|| SecretsError::metadata_unavailable(name, "no rotation configured"))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_and_fetch() {
        let store = InMemorySecretStore::new();
        store.put_secret("app", [("API_KEY", "one")]);

        let set = store.fetch_secret_value("app", "us-west-2").await.unwrap();
        assert_eq!(set.get("API_KEY").unwrap().reveal(), "one");
        assert_eq!(store.value_fetches("app"), 1);
    }

    #[tokio::test]
    async fn test_unknown_secret() {
        let store = InMemorySecretStore::new();
        let err = store.fetch_secret_value("missing", "us-west-2").await.unwrap_err();
        assert!(matches!(err, SecretsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_injected_failures_are_counted() {
        let store = InMemorySecretStore::new();
        store.put_secret("db", [("password", "p")]);
        store.fail_value_fetches("db", Some(SecretsError::store_unavailable("down")));

        assert!(store.fetch_secret_value("db", "us-west-2").await.is_err());
        assert_eq!(store.value_fetches("db"), 1);

        store.fail_value_fetches("db", None);
        assert!(store.fetch_secret_value("db", "us-west-2").await.is_ok());
    }

    #[tokio::test]
    async fn test_metadata_lifecycle() {
        let store = InMemorySecretStore::new();
        store.put_secret("db", [("password", "p")]);

        let err = store.fetch_secret_metadata("db", "us-west-2").await.unwrap_err();
        assert!(matches!(err, SecretsError::MetadataUnavailable { .. }));

        let rotated = Utc::now();
        store.rotate("db", [("password", "q")], rotated, None);
        let meta = store.fetch_secret_metadata("db", "us-west-2").await.unwrap();
        assert_eq!(meta.last_rotated_at, Some(rotated));
        assert_eq!(store.metadata_fetches("db"), 2);
    }
}
