// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stored configuration entries.
//!
//! Every write produces a new immutable entry identified by `(domain, key, version)`.
//! Versions are assigned by the store, start at 1 and grow by one per write to the same
//! `(domain, key)` pair.

use crate::domain::codec::Codec;
use crate::domain::config_key::{ConfigDomain, ConfigKey};
use crate::domain::errors::{ConfigError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A version number assigned by the store.
pub type Version = u64;

/// An entry as it comes back from the store, with its payload still encoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    /// Namespace of the entry
    pub domain: ConfigDomain,
    /// Key within the namespace
    pub key: ConfigKey,
    /// Store-assigned version, starting at 1
    pub version: Version,
    /// Store-assigned insertion time
    pub created: DateTime<Utc>,
    /// Encoded payload
    pub value: Vec<u8>,
}

impl StoredEntry {
    /// Decodes the payload into `T`, keeping the entry metadata.
    ///
    /// A payload that does not fit `T` is reported as [`ConfigError::Deserialization`].
    pub fn decode<T>(self, codec: Codec) -> Result<ConfigEntry<T>>
    where
        T: DeserializeOwned,
    {
        let value = codec
            .decode(&self.value)
            .map_err(|e| ConfigError::deserialization::<T, _>(self.key.as_str(), self.version, e))?;
        Ok(ConfigEntry {
            domain: self.domain,
            key: self.key,
            version: self.version,
            created: self.created,
            value,
        })
    }
}

/// A decoded configuration entry.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use verscfg::domain::{Codec, StoredEntry};
///
/// let stored = StoredEntry {
///     domain: "app".into(),
///     key: "port".into(),
///     version: 2,
///     created: Utc::now(),
///     value: b"8080".to_vec(),
/// };
/// let entry = stored.decode::<u16>(Codec::Json).unwrap();
/// assert_eq!(entry.version, 2);
/// assert_eq!(entry.value, 8080);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry<T> {
    /// Namespace of the entry
    pub domain: ConfigDomain,
    /// Key within the namespace
    pub key: ConfigKey,
    /// Store-assigned version, starting at 1
    pub version: Version,
    /// Store-assigned insertion time
    pub created: DateTime<Utc>,
    /// Decoded value
    pub value: T,
}

impl<T> ConfigEntry<T> {
    /// Discards the metadata and returns the value.
    pub fn into_value(self) -> T {
        self.value
    }
}
