// SPDX-License-Identifier: MIT OR Apache-2.0

//! Versioned store trait definition.
//!
//! This module defines the `VersionedStore` trait, the port through which the façade talks
//! to durable storage. A store knows nothing about value types; it only moves opaque,
//! already-encoded payloads.

use crate::domain::{ConfigDomain, ConfigKey, Result, StoredEntry, Version};
use std::io::Read;

/// A trait for append-only, versioned storage backends.
///
/// # Allocation contract
///
/// [`append`](VersionedStore::append) must assign `max(existing versions) + 1` (or 1 when the
/// pair is new) and insert the row as one atomic step relative to other writers of the same
/// `(domain, key)`, so concurrent writers can never obtain the same version. Failures are
/// reported, never retried.
///
/// A row must only become visible once its whole payload has been read from `value`. If
/// reading `value` returns an error, nothing may be persisted.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; any number of reads and writes may be in flight.
///
/// # Examples
///
/// ```rust
/// use std::io::Read;
/// use verscfg::domain::{ConfigDomain, ConfigKey, Result, StoredEntry, Version};
/// use verscfg::ports::VersionedStore;
///
/// struct NullStore;
///
/// impl VersionedStore for NullStore {
///     fn name(&self) -> &str {
///         "null"
///     }
///
///     fn append(&self, _: &ConfigDomain, _: &ConfigKey, value: &mut dyn Read) -> Result<Version> {
///         std::io::copy(value, &mut std::io::sink())?;
///         Ok(1)
///     }
///
///     fn latest(&self, _: &ConfigDomain, _: &ConfigKey, _: usize) -> Result<Vec<StoredEntry>> {
///         Ok(vec![])
///     }
/// }
///
/// let store = NullStore;
/// assert!(store.latest_str("app", "missing", 1).unwrap().is_empty());
/// ```
pub trait VersionedStore: Send + Sync {
    /// Returns the name of this store, used in logs and error messages.
    fn name(&self) -> &str;

    /// Appends a new version of `(domain, key)` whose payload is read from `value`.
    ///
    /// Returns the version the store assigned.
    fn append(&self, domain: &ConfigDomain, key: &ConfigKey, value: &mut dyn Read)
        -> Result<Version>;

    /// Returns up to `limit` entries for `(domain, key)`, newest (highest version) first.
    ///
    /// An unknown pair yields an empty vector.
    fn latest(&self, domain: &ConfigDomain, key: &ConfigKey, limit: usize)
        -> Result<Vec<StoredEntry>>;

    /// Convenience form of [`latest`](VersionedStore::latest) taking string slices.
    fn latest_str(&self, domain: &str, key: &str, limit: usize) -> Result<Vec<StoredEntry>> {
        self.latest(&ConfigDomain::from(domain), &ConfigKey::from(key), limit)
    }
}
