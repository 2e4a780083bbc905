//! # Error Handling
//!
//! Crate-wide error type. Secret lifecycle failures keep their own taxonomy
//! in [`crate::secrets::SecretsError`] and convert into [`Error::Secrets`].

pub mod types;

pub use types::{Error, Result};
