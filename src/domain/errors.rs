// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the versioned configuration store.
//!
//! This module defines the error types that can occur when reading or writing versioned
//! configuration values. All errors use `thiserror` for proper error handling and conversion.
//!
//! "Nothing stored" is never an error: reads return an empty sequence instead.

use thiserror::Error;

/// The main error type for configuration store operations.
///
/// The three kinds a caller usually cares about are kept apart so they can be told
/// apart without string matching:
///
/// - [`ConfigError::Storage`]: the backing store failed (connectivity, constraint, lock timeout)
/// - [`ConfigError::Serialization`]: a value could not be encoded on write
/// - [`ConfigError::Deserialization`]: a stored payload could not be decoded as the requested type
///
/// # Examples
///
/// ```
/// use verscfg::domain::errors::ConfigError;
///
/// fn write_value() -> Result<(), ConfigError> {
///     Err(ConfigError::Storage {
///         message: "database is locked".to_string(),
///         source: None,
///     })
/// }
///
/// assert!(write_value().unwrap_err().is_storage());
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The storage collaborator failed.
    #[error("Storage error: {message}")]
    Storage {
        /// The error message
        message: String,
        /// The underlying error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A value could not be encoded for storage.
    #[error("Failed to serialize value for key '{key}': {message}")]
    Serialization {
        /// The key being written
        key: String,
        /// The error message
        message: String,
        /// The underlying encoding error, if any
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A stored payload could not be decoded into the requested type.
    #[error(
        "Failed to deserialize version {version} of key '{key}' as {target_type}: {source}"
    )]
    Deserialization {
        /// The key being read
        key: String,
        /// The version whose payload failed to decode
        version: u64,
        /// The requested type name
        target_type: String,
        /// The underlying decoding error
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A domain was registered again with a different codec.
    #[error("Domain '{domain}' is already registered with codec {existing}, not {requested}")]
    CodecConflict {
        /// The domain name
        domain: String,
        /// The codec the existing handle uses
        existing: String,
        /// The codec the caller asked for
        requested: String,
    },

    /// A domain or key is not a valid identifier.
    #[error("Invalid {kind} '{value}': {reason}")]
    InvalidIdentifier {
        /// Either "domain" or "key"
        kind: &'static str,
        /// The rejected identifier
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// The store or façade configuration is invalid.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// The error message
        message: String,
    },

    /// The process-wide registry was used before [`crate::service::install`] was called.
    #[error("No process-wide configuration registry has been installed")]
    NotInstalled,

    /// [`crate::service::install`] was called more than once.
    #[error("A process-wide configuration registry is already installed")]
    AlreadyInstalled,

    /// An I/O error occurred while streaming a value.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ConfigError {
    /// Creates a `Storage` error from an underlying storage failure.
    pub fn storage<E>(message: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ConfigError::Storage {
            message: message.into(),
            source: Some(Box::new(err)),
        }
    }

    /// Creates a `Serialization` error for `key` from an underlying encoding failure.
    pub fn serialization<E>(key: impl Into<String>, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ConfigError::Serialization {
            key: key.into(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Creates a `Deserialization` error for one stored version of `key`.
    pub fn deserialization<T, E>(key: impl Into<String>, version: u64, err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ConfigError::Deserialization {
            key: key.into(),
            version,
            target_type: std::any::type_name::<T>().to_string(),
            source: Box::new(err),
        }
    }

    /// Returns `true` if this error came from the storage collaborator.
    pub fn is_storage(&self) -> bool {
        matches!(self, ConfigError::Storage { .. })
    }

    /// Returns `true` if a value could not be encoded.
    pub fn is_serialization(&self) -> bool {
        matches!(self, ConfigError::Serialization { .. })
    }

    /// Returns `true` if a stored payload could not be decoded as the requested type.
    pub fn is_deserialization(&self) -> bool {
        matches!(self, ConfigError::Deserialization { .. })
    }
}

/// A specialized Result type for configuration store operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
