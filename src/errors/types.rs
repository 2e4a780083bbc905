//! # Error Types
//!
//! Crate-wide error type for startup, configuration and serving, using `thiserror`.

use crate::secrets::SecretsError;

/// Custom result type for vigil operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the vigil service
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors (unparseable or inconsistent settings)
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors (out-of-range settings)
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Network transport errors (HTTP listener, metrics exporter)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Secret lifecycle errors
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), source: None }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config { message: message.into(), source: Some(source) }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_error_creation() {
        let config_error = Error::config("missing secret name");
        assert!(matches!(config_error, Error::Config { .. }));
        assert_eq!(config_error.to_string(), "Configuration error: missing secret name");

        let field_error = Error::validation_field("out of range", "poll_interval_seconds");
        assert!(matches!(field_error, Error::Validation { field: Some(_), .. }));
    }

    #[test]
    fn test_secrets_error_is_transparent() {
        let err: Error = SecretsError::not_found("employee-api-secrets").into();
        assert!(matches!(err, Error::Secrets(SecretsError::NotFound { .. })));
        assert_eq!(err.to_string(), SecretsError::not_found("employee-api-secrets").to_string());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "port taken");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[derive(Validate)]
    struct Bounded {
        #[validate(range(min = 1, max = 10, message = "must be between 1 and 10"))]
        value: u32,
    }

    #[test]
    fn test_validation_errors_conversion() {
        let errors = Bounded { value: 42 }.validate().unwrap_err();
        let err: Error = errors.into();
        let message = err.to_string();
        assert!(message.contains("value"));
        assert!(message.contains("must be between 1 and 10"));
    }
}
