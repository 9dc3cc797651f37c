// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain handles and the registry that hands them out.
//!
//! A [`ConfigRegistry`] memoizes one [`ConfigHandle`] per domain: the first request creates
//! it, later requests get the same `Arc`. Lookup and creation happen under a single lock, so
//! two threads asking for a new domain at once still end up sharing one handle.
//!
//! Registries are ordinary values meant to be built once and passed around. For code that
//! cannot thread a reference through, [`install`] places one registry in a process-wide
//! slot that [`get_config`] reads from.

use super::config_store::ConfigStore;
use crate::domain::{Codec, ConfigDomain, ConfigEntry, ConfigError, ConfigKey, Result};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// A domain-bound accessor.
///
/// Handles are immutable: they carry the domain name and forward every call to the shared
/// [`ConfigStore`], which encodes and decodes with the codec the domain is bound to.
///
/// # Examples
///
/// ```rust
/// use verscfg::adapters::MemoryStore;
/// use verscfg::service::{ConfigRegistry, ConfigStore};
///
/// # fn main() -> verscfg::domain::Result<()> {
/// let registry = ConfigRegistry::new(ConfigStore::new(MemoryStore::new()));
/// let mail = registry.get_config("mail");
///
/// mail.set("relay", "smtp.internal")?;
/// assert_eq!(mail.get("relay", String::new())?, vec!["smtp.internal".to_string()]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigHandle {
    domain: ConfigDomain,
    store: Arc<ConfigStore>,
}

impl ConfigHandle {
    /// Returns the domain this handle is bound to.
    pub fn domain(&self) -> &ConfigDomain {
        &self.domain
    }

    /// Returns the codec used for this domain.
    pub fn codec(&self) -> Codec {
        self.store.codec_for(&self.domain)
    }

    /// Stores `value` as the next version of `key` and returns it.
    pub fn set<T>(&self, key: impl Into<ConfigKey>, value: T) -> Result<T>
    where
        T: Serialize + Sync,
    {
        self.store.set_in(&self.domain, &key.into(), value)
    }

    /// Returns the newest value of `key`, or `[default]` if nothing is stored.
    pub fn get<T>(&self, key: impl Into<ConfigKey>, default: T) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.get_versions(key, default, 1)
    }

    /// Returns up to `count` values of `key`, newest first, or `[default]` if nothing is stored.
    pub fn get_versions<T>(
        &self,
        key: impl Into<ConfigKey>,
        default: T,
        count: usize,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.store
            .get_versions_in(&self.domain, &key.into(), default, count)
    }

    /// Returns the newest value of `key` decoded as `T`; empty if nothing is stored.
    pub fn get_by_type<T>(&self, key: impl Into<ConfigKey>) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.get_by_type_versions(key, 1)
    }

    /// Returns up to `count` values of `key` decoded as `T`, newest first.
    pub fn get_by_type_versions<T>(
        &self,
        key: impl Into<ConfigKey>,
        count: usize,
    ) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        self.store.get_by_type_in(&self.domain, &key.into(), count)
    }

    /// Returns up to `count` entries of `key` with their version metadata.
    pub fn entries<T>(
        &self,
        key: impl Into<ConfigKey>,
        count: usize,
    ) -> Result<Vec<ConfigEntry<T>>>
    where
        T: DeserializeOwned,
    {
        self.store.entries_in(&self.domain, &key.into(), count)
    }
}

/// Memoizing factory of [`ConfigHandle`]s, one per domain.
#[derive(Debug)]
pub struct ConfigRegistry {
    store: Arc<ConfigStore>,
    handles: Mutex<HashMap<ConfigDomain, Arc<ConfigHandle>>>,
}

impl ConfigRegistry {
    /// Creates a registry whose handles share `store`.
    pub fn new(store: ConfigStore) -> Self {
        Self::with_shared_store(Arc::new(store))
    }

    /// Creates a registry over a store shared with other owners.
    pub fn with_shared_store(store: Arc<ConfigStore>) -> Self {
        Self {
            store,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the store handles dispatch to.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Returns the handle for `domain`, creating it on first use.
    ///
    /// A new domain is bound to the store's default codec unless it already has one.
    pub fn get_config(&self, domain: impl Into<ConfigDomain>) -> Arc<ConfigHandle> {
        let domain = domain.into();
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(handles.entry(domain).or_insert_with_key(|domain| {
            let codec = self.store.pin_codec(domain);
            tracing::debug!("registered configuration domain '{}' with codec {}", domain, codec);
            Arc::new(ConfigHandle {
                domain: domain.clone(),
                store: Arc::clone(&self.store),
            })
        }))
    }

    /// Returns the handle for `domain` after binding the domain to `codec`.
    ///
    /// The binding is held by the store, so the domain-explicit calls on
    /// [`ConfigRegistry::store`] use the same codec as the handle. Asking for a domain that is
    /// already bound to a different codec is a [`ConfigError::CodecConflict`].
    pub fn register(
        &self,
        domain: impl Into<ConfigDomain>,
        codec: Codec,
    ) -> Result<Arc<ConfigHandle>> {
        let domain = domain.into();
        self.store.register_codec(domain.clone(), codec)?;
        Ok(self.get_config(domain))
    }

    /// Returns the domains that have a handle, sorted.
    pub fn domains(&self) -> Vec<ConfigDomain> {
        let handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        let mut domains: Vec<ConfigDomain> = handles.keys().cloned().collect();
        domains.sort();
        domains
    }
}

static GLOBAL_REGISTRY: OnceCell<ConfigRegistry> = OnceCell::new();

/// Installs `registry` as the process-wide registry.
///
/// Can succeed only once per process; later calls return [`ConfigError::AlreadyInstalled`].
pub fn install(registry: ConfigRegistry) -> Result<&'static ConfigRegistry> {
    GLOBAL_REGISTRY
        .set(registry)
        .map_err(|_| ConfigError::AlreadyInstalled)?;
    global()
}

/// Returns the process-wide registry.
pub fn global() -> Result<&'static ConfigRegistry> {
    GLOBAL_REGISTRY.get().ok_or(ConfigError::NotInstalled)
}

/// Returns the process-wide handle for `domain`.
///
/// # Examples
///
/// ```rust
/// use verscfg::adapters::MemoryStore;
/// use verscfg::service::{get_config, install, ConfigRegistry, ConfigStore};
///
/// # fn main() -> verscfg::domain::Result<()> {
/// install(ConfigRegistry::new(ConfigStore::new(MemoryStore::new())))?;
///
/// get_config("ui")?.set("theme", "dark")?;
/// assert_eq!(get_config("ui")?.get("theme", String::from("light"))?, vec!["dark".to_string()]);
/// # Ok(())
/// # }
/// ```
pub fn get_config(domain: impl Into<ConfigDomain>) -> Result<Arc<ConfigHandle>> {
    Ok(global()?.get_config(domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryStore;
    use std::thread;

    fn registry() -> ConfigRegistry {
        ConfigRegistry::new(ConfigStore::new(MemoryStore::new()))
    }

    #[test]
    fn test_same_domain_same_handle() {
        let registry = registry();
        let a = registry.get_config("x");
        let b = registry.get_config(String::from("x"));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &registry.get_config("y")));
    }

    #[test]
    fn test_concurrent_first_requests_share_one_handle() {
        let registry = registry();
        let handles: Vec<Arc<ConfigHandle>> = thread::scope(|scope| {
            let workers: Vec<_> = (0..16)
                .map(|_| scope.spawn(|| registry.get_config("domain-x")))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        for handle in &handles[1..] {
            assert!(Arc::ptr_eq(&handles[0], handle));
        }
        assert_eq!(registry.domains(), vec![ConfigDomain::from("domain-x")]);
    }

    #[test]
    fn test_handle_uses_store_codec() {
        let store = ConfigStore::builder()
            .with_memory_store()
            .with_codec(Codec::JsonPretty)
            .build()
            .unwrap();
        let registry = ConfigRegistry::new(store);
        assert_eq!(registry.get_config("d").codec(), Codec::JsonPretty);
    }

    #[test]
    fn test_register_codec_conflict() {
        let registry = registry();
        registry.get_config("d");
        let err = registry.register("d", Codec::JsonPretty).unwrap_err();
        assert!(matches!(err, ConfigError::CodecConflict { .. }));
        assert!(registry.register("d", Codec::Json).is_ok());
    }

    #[test]
    fn test_register_then_get_config_returns_registered() {
        let registry = registry();
        let registered = registry.register("d", Codec::JsonPretty).unwrap();
        let fetched = registry.get_config("d");
        assert!(Arc::ptr_eq(&registered, &fetched));
        assert_eq!(fetched.codec(), Codec::JsonPretty);
    }

    #[test]
    fn test_registered_codec_is_used_by_store_calls() {
        let registry = registry();
        let ops = registry.register("ops", Codec::JsonPretty).unwrap();
        ops.set("retries", vec![1u32, 2, 3]).unwrap();

        let through_store: Vec<Vec<u32>> =
            registry.store().get_by_type("ops", "retries").unwrap();
        assert_eq!(through_store, vec![vec![1, 2, 3]]);

        registry.store().set("ops", "retries", vec![4u32]).unwrap();
        assert_eq!(
            ops.get_versions("retries", Vec::<i32>::new(), 2).unwrap(),
            vec![vec![4], vec![1, 2, 3]]
        );
    }

    #[test]
    fn test_register_after_store_write_conflicts() {
        let registry = registry();
        registry.store().set("d", "k", 1).unwrap();
        let err = registry.register("d", Codec::JsonPretty).unwrap_err();
        assert!(matches!(err, ConfigError::CodecConflict { .. }));
    }

    #[test]
    fn test_handles_are_isolated_by_domain() {
        let registry = registry();
        registry.get_config("A").set("k", "x").unwrap();
        registry.get_config("B").set("k", "y").unwrap();
        let a: Vec<String> = registry.get_config("A").get_by_type("k").unwrap();
        assert_eq!(a, vec!["x".to_string()]);
    }

    #[test]
    fn test_handle_and_store_see_the_same_data() {
        let registry = registry();
        let handle = registry.get_config("d");
        handle.set("k", 1).unwrap();
        handle.set("k", 2).unwrap();
        let from_store: Vec<i32> = registry.store().get_by_type_versions("d", "k", 5).unwrap();
        assert_eq!(from_store, vec![2, 1]);
        assert_eq!(handle.get_versions("k", 0, 5).unwrap(), vec![2, 1]);
        assert_eq!(handle.entries::<i32>("k", 1).unwrap()[0].version, 2);
        assert_eq!(handle.domain().as_str(), "d");
    }
}
