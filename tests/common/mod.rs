// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers and test stores for integration tests.

use std::io::{self, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use verscfg::adapters::MemoryStore;
use verscfg::domain::{ConfigDomain, ConfigError, ConfigKey, Result, StoredEntry, Version};
use verscfg::ports::VersionedStore;

/// Routes `tracing` output to the test harness. Safe to call from every test.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Opens a SQLite-backed store in `dir`.
#[cfg(feature = "sqlite")]
#[allow(dead_code)]
pub fn sqlite_store(dir: &tempfile::TempDir) -> verscfg::service::ConfigStore {
    use verscfg::adapters::SqliteStoreConfig;
    use verscfg::service::ConfigStore;

    ConfigStore::builder()
        .with_sqlite(SqliteStoreConfig::new(dir.path().join("config.sqlite3")))
        .build()
        .unwrap()
}

/// A memory store that records how the value stream is consumed.
///
/// Reads are issued with a buffer much larger than any pipe used in tests, so the largest
/// single read shows how many bytes the pipe ever held at once.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct RecordingStore {
    inner: MemoryStore,
    largest_read: AtomicUsize,
    total_read: AtomicUsize,
    delay: Duration,
}

#[allow(dead_code)]
impl RecordingStore {
    /// Creates a store that starts reading immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that waits `delay` before reading each value.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    /// Largest number of bytes returned by one read of a value stream.
    pub fn largest_read(&self) -> usize {
        self.largest_read.load(Ordering::SeqCst)
    }

    /// Total bytes read over all value streams.
    pub fn total_read(&self) -> usize {
        self.total_read.load(Ordering::SeqCst)
    }
}

impl VersionedStore for RecordingStore {
    fn name(&self) -> &str {
        "recording"
    }

    fn append(
        &self,
        domain: &ConfigDomain,
        key: &ConfigKey,
        value: &mut dyn Read,
    ) -> Result<Version> {
        std::thread::sleep(self.delay);
        let mut bytes = Vec::new();
        let mut chunk = vec![0u8; 1024 * 1024];
        loop {
            let n = value.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            self.largest_read.fetch_max(n, Ordering::SeqCst);
            self.total_read.fetch_add(n, Ordering::SeqCst);
            bytes.extend_from_slice(&chunk[..n]);
        }
        let mut replay: &[u8] = &bytes;
        self.inner.append(domain, key, &mut replay)
    }

    fn latest(
        &self,
        domain: &ConfigDomain,
        key: &ConfigKey,
        limit: usize,
    ) -> Result<Vec<StoredEntry>> {
        self.inner.latest(domain, key, limit)
    }
}

/// A store whose every operation fails like an unreachable database.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct UnreachableStore;

impl VersionedStore for UnreachableStore {
    fn name(&self) -> &str {
        "unreachable"
    }

    fn append(&self, _: &ConfigDomain, _: &ConfigKey, _: &mut dyn Read) -> Result<Version> {
        Err(ConfigError::storage(
            "connection refused",
            io::Error::new(io::ErrorKind::ConnectionRefused, "no route to database"),
        ))
    }

    fn latest(&self, _: &ConfigDomain, _: &ConfigKey, _: usize) -> Result<Vec<StoredEntry>> {
        Err(ConfigError::storage(
            "connection refused",
            io::Error::new(io::ErrorKind::ConnectionRefused, "no route to database"),
        ))
    }
}

/// A store that reads only the first few bytes of a value and reports success.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct ShortReadStore {
    inner: MemoryStore,
}

impl VersionedStore for ShortReadStore {
    fn name(&self) -> &str {
        "short-read"
    }

    fn append(
        &self,
        domain: &ConfigDomain,
        key: &ConfigKey,
        value: &mut dyn Read,
    ) -> Result<Version> {
        let mut head = [0u8; 4];
        value.read_exact(&mut head)?;
        let mut truncated: &[u8] = &head;
        self.inner.append(domain, key, &mut truncated)
    }

    fn latest(
        &self,
        domain: &ConfigDomain,
        key: &ConfigKey,
        limit: usize,
    ) -> Result<Vec<StoredEntry>> {
        self.inner.latest(domain, key, limit)
    }
}
