// SPDX-License-Identifier: MIT OR Apache-2.0

//! The read/write façade.
//!
//! `ConfigStore` combines a [`VersionedStore`] with the streaming serializer and exposes
//! typed `set`/`get` operations addressed by an explicit `(domain, key)` pair. Domain-bound
//! handles ([`ConfigHandle`](super::registry::ConfigHandle)) dispatch here.

use super::pipe::DEFAULT_PIPE_CAPACITY;
use super::serializer::StreamingSerializer;
use crate::adapters::MemoryStore;
use crate::domain::{Codec, ConfigDomain, ConfigEntry, ConfigError, ConfigKey, Result};
use crate::ports::VersionedStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[cfg(feature = "sqlite")]
use crate::adapters::sqlite::{SqliteStore, SqliteStoreConfig};

/// Typed, versioned access to a [`VersionedStore`].
///
/// Every `set` appends a new version; reads return the newest versions first. Reads never
/// treat "nothing stored" as an error: they return an empty sequence, or `[default]` for
/// the variants taking a default.
///
/// # Examples
///
/// ```rust
/// use verscfg::adapters::MemoryStore;
/// use verscfg::service::ConfigStore;
///
/// # fn main() -> verscfg::domain::Result<()> {
/// let store = ConfigStore::new(MemoryStore::new());
///
/// store.set("http", "port", 8080u16)?;
/// store.set("http", "port", 8081u16)?;
///
/// assert_eq!(store.get("http", "port", 80u16)?, vec![8081]);
/// assert_eq!(store.get_by_type_versions::<u16>("http", "port", 5)?, vec![8081, 8080]);
/// assert_eq!(store.get("http", "timeout", 30u32)?, vec![30]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConfigStore {
    backend: Arc<dyn VersionedStore>,
    serializer: StreamingSerializer,
    domain_codecs: Arc<RwLock<HashMap<ConfigDomain, Codec>>>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("backend", &self.backend.name())
            .field("serializer", &self.serializer)
            .finish()
    }
}

impl ConfigStore {
    /// Creates a façade over `backend` with the default codec and pipe capacity.
    pub fn new(backend: impl VersionedStore + 'static) -> Self {
        Self::from_parts(Arc::new(backend), StreamingSerializer::default())
    }

    fn from_parts(backend: Arc<dyn VersionedStore>, serializer: StreamingSerializer) -> Self {
        Self {
            backend,
            serializer,
            domain_codecs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Creates a new builder.
    pub fn builder() -> ConfigStoreBuilder {
        ConfigStoreBuilder::new()
    }

    /// Returns the storage backend.
    pub fn backend(&self) -> &dyn VersionedStore {
        self.backend.as_ref()
    }

    /// Returns the codec used for domains without a codec of their own.
    pub fn codec(&self) -> Codec {
        self.serializer.codec()
    }

    /// Returns the codec values of `domain` are encoded with.
    pub fn codec_for(&self, domain: &ConfigDomain) -> Codec {
        self.domain_codecs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain)
            .copied()
            .unwrap_or_else(|| self.codec())
    }

    /// Binds `domain` to `codec` for every later read and write, through this store or any
    /// handle sharing it.
    ///
    /// A domain keeps the codec it was first bound to; binding it to a different one is a
    /// [`ConfigError::CodecConflict`]. Writing to a domain binds it to the default codec.
    pub fn register_codec(&self, domain: impl Into<ConfigDomain>, codec: Codec) -> Result<()> {
        let domain = domain.into();
        domain.validate()?;
        let mut codecs = self
            .domain_codecs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match codecs.get(&domain) {
            Some(existing) if *existing != codec => Err(ConfigError::CodecConflict {
                domain: domain.into_string(),
                existing: existing.to_string(),
                requested: codec.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                tracing::debug!("bound domain '{}' to codec {}", domain, codec);
                codecs.insert(domain, codec);
                Ok(())
            }
        }
    }

    /// Binds `domain` to the default codec unless it already has one; returns its codec.
    pub(crate) fn pin_codec(&self, domain: &ConfigDomain) -> Codec {
        if let Some(codec) = self
            .domain_codecs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(domain)
        {
            return *codec;
        }
        *self
            .domain_codecs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(domain.clone())
            .or_insert_with(|| self.serializer.codec())
    }

    /// Returns the capacity of the pipe between encoder and store.
    pub fn pipe_capacity(&self) -> usize {
        self.serializer.capacity()
    }

    /// Stores `value` as the next version of `(domain, key)` and returns it.
    ///
    /// Returns only after the value is durably stored or an error occurred.
    pub fn set<T>(
        &self,
        domain: impl Into<ConfigDomain>,
        key: impl Into<ConfigKey>,
        value: T,
    ) -> Result<T>
    where
        T: Serialize + Sync,
    {
        self.set_in(&domain.into(), &key.into(), value)
    }

    /// Returns the newest value of `(domain, key)`, or `[default]` if nothing is stored.
    ///
    /// The target type is taken from `default`.
    pub fn get<T>(
        &self,
        domain: impl Into<ConfigDomain>,
        key: impl Into<ConfigKey>,
        default: T,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.get_versions(domain, key, default, 1)
    }

    /// Returns up to `count` values of `(domain, key)`, newest first, or `[default]` if
    /// nothing is stored.
    pub fn get_versions<T>(
        &self,
        domain: impl Into<ConfigDomain>,
        key: impl Into<ConfigKey>,
        default: T,
        count: usize,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.get_versions_in(&domain.into(), &key.into(), default, count)
    }

    /// Returns the newest value of `(domain, key)` decoded as `T`; empty if nothing is stored.
    pub fn get_by_type<T>(
        &self,
        domain: impl Into<ConfigDomain>,
        key: impl Into<ConfigKey>,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.get_by_type_versions(domain, key, 1)
    }

    /// Returns up to `count` values of `(domain, key)` decoded as `T`, newest first.
    pub fn get_by_type_versions<T>(
        &self,
        domain: impl Into<ConfigDomain>,
        key: impl Into<ConfigKey>,
        count: usize,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.get_by_type_in(&domain.into(), &key.into(), count)
    }

    /// Returns up to `count` entries of `(domain, key)` with their version metadata.
    pub fn entries<T>(
        &self,
        domain: impl Into<ConfigDomain>,
        key: impl Into<ConfigKey>,
        count: usize,
    ) -> Result<Vec<ConfigEntry<T>>>
    where
        T: DeserializeOwned,
    {
        self.entries_in(&domain.into(), &key.into(), count)
    }

    pub(crate) fn set_in<T>(&self, domain: &ConfigDomain, key: &ConfigKey, value: T) -> Result<T>
    where
        T: Serialize + Sync,
    {
        domain.validate()?;
        key.validate()?;
        let codec = self.pin_codec(domain);
        let serializer = StreamingSerializer::new(codec, self.serializer.capacity());
        let version = serializer.write_with(key, &value, |stream| {
            self.backend.append(domain, key, stream)
        })?;
        tracing::debug!(
            "set '{}/{}' to version {} via {}",
            domain,
            key,
            version,
            self.backend.name()
        );
        Ok(value)
    }

    pub(crate) fn get_versions_in<T>(
        &self,
        domain: &ConfigDomain,
        key: &ConfigKey,
        default: T,
        count: usize,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut values = self.get_by_type_in(domain, key, count)?;
        if values.is_empty() {
            values.push(default);
        }
        Ok(values)
    }

    pub(crate) fn get_by_type_in<T>(
        &self,
        domain: &ConfigDomain,
        key: &ConfigKey,
        count: usize,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        Ok(self
            .entries_in(domain, key, count)?
            .into_iter()
            .map(ConfigEntry::into_value)
            .collect())
    }

    pub(crate) fn entries_in<T>(
        &self,
        domain: &ConfigDomain,
        key: &ConfigKey,
        count: usize,
    ) -> Result<Vec<ConfigEntry<T>>>
    where
        T: DeserializeOwned,
    {
        domain.validate()?;
        key.validate()?;
        let codec = self.codec_for(domain);
        let stored = self.backend.latest(domain, key, count)?;
        tracing::debug!(
            "read {} version(s) of '{}/{}' from {}",
            stored.len(),
            domain,
            key,
            self.backend.name()
        );
        stored.into_iter().map(|entry| entry.decode(codec)).collect()
    }
}

/// Builder for constructing a [`ConfigStore`].
///
/// # Examples
///
/// ```rust
/// use verscfg::domain::Codec;
/// use verscfg::service::ConfigStoreBuilder;
///
/// # fn main() -> verscfg::domain::Result<()> {
/// let store = ConfigStoreBuilder::new()
///     .with_memory_store()
///     .with_codec(Codec::JsonPretty)
///     .with_pipe_capacity(4 * 1024)
///     .build()?;
/// assert_eq!(store.pipe_capacity(), 4 * 1024);
/// # Ok(())
/// # }
/// ```
pub struct ConfigStoreBuilder {
    backend: Option<Arc<dyn VersionedStore>>,
    #[cfg(feature = "sqlite")]
    sqlite: Option<SqliteStoreConfig>,
    codec: Codec,
    pipe_capacity: usize,
}

impl ConfigStoreBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            backend: None,
            #[cfg(feature = "sqlite")]
            sqlite: None,
            codec: Codec::default(),
            pipe_capacity: DEFAULT_PIPE_CAPACITY,
        }
    }

    /// Uses `backend` for storage.
    pub fn with_store(self, backend: impl VersionedStore + 'static) -> Self {
        self.with_shared_store(Arc::new(backend))
    }

    /// Uses a backend shared with other owners.
    pub fn with_shared_store(mut self, backend: Arc<dyn VersionedStore>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Uses a fresh in-memory backend.
    pub fn with_memory_store(self) -> Self {
        self.with_store(MemoryStore::new())
    }

    /// Opens a SQLite backend with `config` when the store is built.
    #[cfg(feature = "sqlite")]
    pub fn with_sqlite(mut self, config: SqliteStoreConfig) -> Self {
        self.sqlite = Some(config);
        self
    }

    /// Sets the default codec.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the capacity in bytes of the pipe between encoder and store.
    pub fn with_pipe_capacity(mut self, pipe_capacity: usize) -> Self {
        self.pipe_capacity = pipe_capacity;
        self
    }

    /// Builds the store.
    ///
    /// An explicitly supplied backend wins over a SQLite configuration.
    pub fn build(self) -> Result<ConfigStore> {
        if self.pipe_capacity == 0 {
            return Err(ConfigError::InvalidConfig {
                message: "pipe_capacity must be greater than zero".to_string(),
            });
        }

        let backend = match self.backend {
            Some(backend) => backend,
            None => self.open_sqlite()?,
        };

        Ok(ConfigStore::from_parts(
            backend,
            StreamingSerializer::new(self.codec, self.pipe_capacity),
        ))
    }

    #[cfg(feature = "sqlite")]
    fn open_sqlite(&self) -> Result<Arc<dyn VersionedStore>> {
        match &self.sqlite {
            Some(config) => Ok(Arc::new(SqliteStore::open(config.clone())?)),
            None => Err(no_backend()),
        }
    }

    #[cfg(not(feature = "sqlite"))]
    fn open_sqlite(&self) -> Result<Arc<dyn VersionedStore>> {
        Err(no_backend())
    }
}

impl Default for ConfigStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn no_backend() -> ConfigError {
    ConfigError::InvalidConfig {
        message: "no storage backend configured".to_string(),
    }
}
