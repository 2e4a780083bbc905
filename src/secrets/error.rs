//! Error types for secret lifecycle operations.

use thiserror::Error;

/// Result type for secrets operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while fetching or refreshing secrets.
///
/// Every variant is recoverable where it occurs: the refresh cycle logs it,
/// keeps the last good cache contents and falls back to a conservative
/// timer. Only the manual trigger surfaces it to a caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretsError {
    /// Network or authentication failure reaching the secret store.
    #[error("Secret store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// The named secret does not exist in the store.
    #[error("Secret not found: {name}")]
    NotFound { name: String },

    /// The secret payload is not parseable as the expected structure.
    #[error("Malformed secret '{name}': {reason}")]
    Malformed { name: String, reason: String },

    /// Rotation metadata is missing or the store does not support it.
    #[error("Rotation metadata unavailable for '{name}': {reason}")]
    MetadataUnavailable { name: String, reason: String },

    /// The lifecycle manager has been shut down.
    #[error("Secret manager is shut down")]
    Shutdown,
}

impl SecretsError {
    /// Create a store unavailable error.
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable { message: message.into() }
    }

    /// Create a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a malformed secret error.
    pub fn malformed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed { name: name.into(), reason: reason.into() }
    }

    /// Create a metadata unavailable error.
    pub fn metadata_unavailable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MetadataUnavailable { name: name.into(), reason: reason.into() }
    }

    /// Stable snake_case name used in log fields, metric labels and API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::NotFound { .. } => "secret_not_found",
            Self::Malformed { .. } => "malformed_secret",
            Self::MetadataUnavailable { .. } => "metadata_unavailable",
            Self::Shutdown => "shutdown",
        }
    }

    /// Whether a later attempt may succeed without operator intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::MetadataUnavailable { .. })
    }
}
