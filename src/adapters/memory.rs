// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory versioned store adapter.
//!
//! Useful for tests and for embedding without a database file. Nothing survives the process.

use crate::domain::{ConfigDomain, ConfigError, ConfigKey, Result, StoredEntry, Version};
use crate::ports::VersionedStore;
use chrono::Utc;
use std::collections::HashMap;
use std::io::Read;
use std::sync::{Mutex, PoisonError};

type History = Vec<StoredEntry>;

/// A [`VersionedStore`] kept in process memory.
///
/// Each `(domain, key)` history is a vector ordered oldest first, so the next version is
/// always `len + 1`. Allocation and insertion happen under one mutex.
///
/// # Examples
///
/// ```rust
/// use verscfg::adapters::MemoryStore;
/// use verscfg::domain::{ConfigDomain, ConfigKey};
/// use verscfg::ports::VersionedStore;
///
/// let store = MemoryStore::new();
/// let (domain, key) = (ConfigDomain::from("app"), ConfigKey::from("name"));
///
/// let mut payload: &[u8] = b"\"demo\"";
/// assert_eq!(store.append(&domain, &key, &mut payload).unwrap(), 1);
/// assert_eq!(store.latest(&domain, &key, 10).unwrap().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    histories: Mutex<HashMap<(ConfigDomain, ConfigKey), History>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionedStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn append(
        &self,
        domain: &ConfigDomain,
        key: &ConfigKey,
        value: &mut dyn Read,
    ) -> Result<Version> {
        // Drain first so a failing stream never touches the map.
        let mut bytes = Vec::new();
        value.read_to_end(&mut bytes).map_err(|e| {
            ConfigError::storage(format!("Value stream for '{}/{}' failed", domain, key), e)
        })?;

        let mut histories = self
            .histories
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let history = histories
            .entry((domain.clone(), key.clone()))
            .or_default();
        let version = history.len() as Version + 1;
        history.push(StoredEntry {
            domain: domain.clone(),
            key: key.clone(),
            version,
            created: Utc::now(),
            value: bytes,
        });
        tracing::debug!(
            "memory store appended '{}/{}' version {}",
            domain,
            key,
            version
        );
        Ok(version)
    }

    fn latest(
        &self,
        domain: &ConfigDomain,
        key: &ConfigKey,
        limit: usize,
    ) -> Result<Vec<StoredEntry>> {
        let histories = self
            .histories
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(histories
            .get(&(domain.clone(), key.clone()))
            .map(|history| history.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
