//! Secret store client boundary.

use async_trait::async_trait;

use super::error::Result;
use super::types::{RotationMetadata, SecretSet};

/// Adapter over an external secret-management API.
///
/// The lifecycle manager needs exactly two operations from the store. Both
/// may fail, and implementations MUST NOT retry internally: the refresh
/// scheduler and drift poller own the retry policy.
///
/// # Security Considerations
///
/// - Implementations MUST NOT log secret values
/// - Error messages MUST NOT embed payload contents
///
/// # Example Implementation
///
/// ```rust,ignore
/// use vigil::secrets::{RotationMetadata, SecretSet, SecretStoreClient, Result};
/// use async_trait::async_trait;
///
/// struct StaticStore;
///
/// #[async_trait]
/// impl SecretStoreClient for StaticStore {
///     async fn fetch_secret_value(&self, name: &str, _region: &str) -> Result<SecretSet> {
///         Ok(SecretSet::from_pairs([("API_KEY", "static")]))
///     }
///
///     async fn fetch_secret_metadata(&self, _name: &str, _region: &str) -> Result<RotationMetadata> {
///         Ok(RotationMetadata::default())
///     }
/// }
/// ```
#[async_trait]
pub trait SecretStoreClient: Send + Sync {
    /// Fetch the current value of a secret and parse it into a [`SecretSet`].
    ///
    /// # Errors
    ///
    /// - [`SecretsError::StoreUnavailable`](super::SecretsError::StoreUnavailable) if the store is unreachable
    /// - [`SecretsError::NotFound`](super::SecretsError::NotFound) if the secret doesn't exist
    /// - [`SecretsError::Malformed`](super::SecretsError::Malformed) if the payload isn't a flat JSON object
    async fn fetch_secret_value(&self, name: &str, region: &str) -> Result<SecretSet>;

    /// Fetch rotation metadata only; the secret value is not transferred.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::MetadataUnavailable`](super::SecretsError::MetadataUnavailable) if the store has no rotation data
    /// - any error [`fetch_secret_value`](Self::fetch_secret_value) may return
    async fn fetch_secret_metadata(&self, name: &str, region: &str) -> Result<RotationMetadata>;

    /// Short backend identifier for logs.
    fn backend_name(&self) -> &'static str {
        "custom"
    }
}
