//! Environment variable secret store implementation.
//!
//! Intended for **development and testing only**. Secret payloads are read
//! from environment variables with the `VIGIL_SECRET_` prefix:
//!
//! ```bash
//! export VIGIL_SECRET_EMPLOYEE_API_SECRETS='{"API_KEY":"dev-key","DB_HOST":"localhost"}'
//! export VIGIL_SECRET_EMPLOYEE_API_SECRETS_LAST_ROTATED="2026-10-01T00:00:00Z"
//! export VIGIL_SECRET_EMPLOYEE_API_SECRETS_NEXT_ROTATION="2026-11-01T00:00:00Z"
//! ```
//!
//! # Limitations
//!
//! - The process environment is read on every fetch, so rotation can only be
//!   simulated by the process itself
//! - The region argument is ignored
//! - Without either rotation variable the store reports
//!   [`SecretsError::MetadataUnavailable`] and the scheduler uses its fallback delay

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::env;

use super::client::SecretStoreClient;
use super::error::{Result, SecretsError};
use super::types::{parse_secret_payload, RotationMetadata, SecretSet};

/// Environment variable prefix for secrets.
const SECRET_PREFIX: &str = "VIGIL_SECRET_";
const LAST_ROTATED_SUFFIX: &str = "_LAST_ROTATED";
const NEXT_ROTATION_SUFFIX: &str = "_NEXT_ROTATION";

/// Environment variable secret store (development only).
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore {}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts a store secret name to its environment variable name.
    ///
    /// ```rust,ignore
    /// assert_eq!(
    ///     EnvSecretStore::name_to_env_var("employee-api-secrets"),
    ///     "VIGIL_SECRET_EMPLOYEE_API_SECRETS"
    /// );
    /// ```
    fn name_to_env_var(name: &str) -> String {
        let normalized: String = name
            .chars()
            .map(|c| match c {
                '-' | '.' | '/' => '_',
                other => other.to_ascii_uppercase(),
            })
            .collect();
        format!("{}{}", SECRET_PREFIX, normalized)
    }

    fn read_timestamp(name: &str, var: &str) -> Result<Option<DateTime<Utc>>> {
        match env::var(var) {
            Ok(raw) => DateTime::parse_from_rfc3339(raw.trim())
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(|e| {
                    SecretsError::malformed(name, format!("{} is not RFC 3339: {}", var, e))
                }),
            Err(_) => Ok(None),
        }
    }
}

#[async_trait]
impl SecretStoreClient for EnvSecretStore {
    async fn fetch_secret_value(&self, name: &str, _region: &str) -> Result<SecretSet> {
        let env_var = Self::name_to_env_var(name);

        let payload = env::var(&env_var).map_err(|_| {
            SecretsError::not_found(format!("{} (looking for {})", name, env_var))
        })?;

        parse_secret_payload(name, &payload)
    }

    async fn fetch_secret_metadata(&self, name: &str, _region: &str) -> Result<RotationMetadata> {
        let base = Self::name_to_env_var(name);
        if env::var(&base).is_err() {
            return Err(SecretsError::not_found(format!("{} (looking for {})", name, base)));
        }

        let last = Self::read_timestamp(name, &format!("{}{}", base, LAST_ROTATED_SUFFIX))?;
        let next = Self::read_timestamp(name, &format!("{}{}", base, NEXT_ROTATION_SUFFIX))?;

        if last.is_none() && next.is_none() {
            return Err(SecretsError::metadata_unavailable(
                name,
                "no rotation timestamps configured in the environment",
            ));
        }

        Ok(RotationMetadata::new(last, next))
    }

    fn backend_name(&self) -> &'static str {
        "env"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Tests in this module mutate shared process environment.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_name_to_env_var() {
        assert_eq!(
            EnvSecretStore::name_to_env_var("employee-api-secrets"),
            "VIGIL_SECRET_EMPLOYEE_API_SECRETS"
        );
        assert_eq!(EnvSecretStore::name_to_env_var("prod/db.creds"), "VIGIL_SECRET_PROD_DB_CREDS");
    }

    #[tokio::test]
    async fn test_fetch_value_not_found() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let store = EnvSecretStore::new();
        let result = store.fetch_secret_value("env-store-missing", "us-west-2").await;
        assert!(matches!(result.unwrap_err(), SecretsError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_fetch_value_from_env() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("VIGIL_SECRET_ENV_STORE_VALUE", r#"{"API_KEY":"dev-key","PORT":3000}"#);

        let store = EnvSecretStore::new();
        let set = store.fetch_secret_value("env-store-value", "us-west-2").await.unwrap();
        assert_eq!(set.get("API_KEY").unwrap().reveal(), "dev-key");
        assert_eq!(set.get("PORT").unwrap().reveal(), "3000");

        env::remove_var("VIGIL_SECRET_ENV_STORE_VALUE");
    }

    #[tokio::test]
    async fn test_fetch_value_malformed() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("VIGIL_SECRET_ENV_STORE_BAD", "plain-text");

        let store = EnvSecretStore::new();
        let err = store.fetch_secret_value("env-store-bad", "us-west-2").await.unwrap_err();
        assert!(matches!(err, SecretsError::Malformed { .. }));

        env::remove_var("VIGIL_SECRET_ENV_STORE_BAD");
    }

    #[tokio::test]
    async fn test_metadata_unavailable_without_timestamps() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("VIGIL_SECRET_ENV_STORE_NOMETA", "{}");

        let store = EnvSecretStore::new();
        let err = store.fetch_secret_metadata("env-store-nometa", "us-west-2").await.unwrap_err();
        assert!(matches!(err, SecretsError::MetadataUnavailable { .. }));

        env::remove_var("VIGIL_SECRET_ENV_STORE_NOMETA");
    }

    #[tokio::test]
    async fn test_metadata_from_env() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("VIGIL_SECRET_ENV_STORE_META", "{}");
        env::set_var("VIGIL_SECRET_ENV_STORE_META_LAST_ROTATED", "2026-10-01T00:00:00Z");
        env::set_var("VIGIL_SECRET_ENV_STORE_META_NEXT_ROTATION", "2026-11-01T00:00:00+00:00");

        let store = EnvSecretStore::new();
        let meta = store.fetch_secret_metadata("env-store-meta", "us-west-2").await.unwrap();
        assert_eq!(meta.last_rotated_at.unwrap().to_rfc3339(), "2026-10-01T00:00:00+00:00");
        assert!(meta.next_rotation_at.unwrap() > meta.last_rotated_at.unwrap());

        env::set_var("VIGIL_SECRET_ENV_STORE_META_NEXT_ROTATION", "next tuesday");
        let err = store.fetch_secret_metadata("env-store-meta", "us-west-2").await.unwrap_err();
        assert!(matches!(err, SecretsError::Malformed { .. }));

        env::remove_var("VIGIL_SECRET_ENV_STORE_META");
        env::remove_var("VIGIL_SECRET_ENV_STORE_META_LAST_ROTATED");
        env::remove_var("VIGIL_SECRET_ENV_STORE_META_NEXT_ROTATION");
    }
}
