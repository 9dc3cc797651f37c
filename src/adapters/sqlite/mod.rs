// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite versioned store adapter.
//!
//! Versions live in `_configuration`, keyed by `(domain, key, version)`; their payloads live
//! in `_configuration_chunk` as an ordered run of fixed-size chunks, so writing a value costs
//! one insert per chunk no matter how large it grows. A write allocates its version and
//! inserts its row in the same statement, inside a `BEGIN IMMEDIATE` transaction, so SQLite's
//! write lock (not an application lock) keeps concurrent writers from ever computing the same
//! version. The transaction commits only after the payload stream ends cleanly.
//!
//! Writers sharing one [`SqliteStore`] queue on a store-wide mutex before they begin their
//! transaction, so they wait for each other instead of running into `busy_timeout_ms`. Only
//! writers in other stores or processes contend on SQLite's lock directly.

pub mod config;
pub mod pool;

pub use config::{JournalMode, SqliteStoreConfig};
pub use pool::{ConnectionPool, PooledConnection};

use crate::domain::{ConfigDomain, ConfigError, ConfigKey, Result, StoredEntry, Version};
use crate::ports::VersionedStore;
use chrono::{NaiveDateTime, TimeZone, Utc};
use rusqlite::{params, TransactionBehavior};
use std::fs;
use std::io::{self, Read};
use std::sync::{Mutex, PoisonError};

/// Bytes stored per row of `_configuration_chunk`.
const STREAM_CHUNK_SIZE: usize = 16 * 1024;

const CREATE_TABLES: &str = "CREATE TABLE IF NOT EXISTS _configuration (\
     domain TEXT NOT NULL, \
     key TEXT NOT NULL, \
     version INTEGER NOT NULL CHECK (version > 0), \
     created TEXT NOT NULL DEFAULT (strftime('%Y-%m-%d %H:%M:%f', 'now')), \
     PRIMARY KEY (domain, key, version)); \
     CREATE TABLE IF NOT EXISTS _configuration_chunk (\
     domain TEXT NOT NULL, \
     key TEXT NOT NULL, \
     version INTEGER NOT NULL, \
     seq INTEGER NOT NULL, \
     data BLOB NOT NULL, \
     PRIMARY KEY (domain, key, version, seq));";

const INSERT_NEXT_VERSION: &str = "INSERT INTO _configuration (domain, key, version) \
     SELECT ?1, ?2, coalesce(max(version) + 1, 1) \
     FROM _configuration WHERE domain = ?1 AND key = ?2 \
     RETURNING version";

const INSERT_CHUNK: &str = "INSERT INTO _configuration_chunk (domain, key, version, seq, data) \
     VALUES (?1, ?2, ?3, ?4, ?5)";

const SELECT_LATEST: &str = "SELECT v.version, v.created, c.data \
     FROM (SELECT version, created FROM _configuration \
           WHERE domain = ?1 AND key = ?2 \
           ORDER BY version DESC LIMIT ?3) AS v \
     LEFT JOIN _configuration_chunk AS c \
       ON c.domain = ?1 AND c.key = ?2 AND c.version = v.version \
     ORDER BY v.version DESC, c.seq ASC";

/// A [`VersionedStore`] backed by a SQLite database file.
///
/// # Examples
///
/// ```rust,no_run
/// use verscfg::adapters::sqlite::{SqliteStore, SqliteStoreConfig};
///
/// # fn main() -> verscfg::domain::Result<()> {
/// let store = SqliteStore::open(SqliteStoreConfig::new("/var/lib/myapp/config.sqlite3"))?;
///
/// // Or in the OS data directory for the application
/// let store = SqliteStore::open(SqliteStoreConfig::default_location("myapp", "com.example")?)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SqliteStore {
    config: SqliteStoreConfig,
    pool: ConnectionPool,
    writer: Mutex<()>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database and its tables.
    pub fn open(config: SqliteStoreConfig) -> Result<Self> {
        config.validate()?;
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let pool = ConnectionPool::open(&config)?;
        pool.get()
            .execute_batch(CREATE_TABLES)
            .map_err(|e| ConfigError::storage("Failed to create configuration tables", e))?;
        tracing::debug!("SQLite store ready at '{}'", config.path.display());
        Ok(Self {
            config,
            pool,
            writer: Mutex::new(()),
        })
    }

    /// Returns the configuration the store was opened with.
    pub fn config(&self) -> &SqliteStoreConfig {
        &self.config
    }
}

impl VersionedStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn append(
        &self,
        domain: &ConfigDomain,
        key: &ConfigKey,
        value: &mut dyn Read,
    ) -> Result<Version> {
        // Held until the transaction ends; a stalled stream stalls later writers too.
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut conn = self.pool.get();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ConfigError::storage("Failed to begin write transaction", e))?;

        let version: i64 = tx
            .query_row(
                INSERT_NEXT_VERSION,
                params![domain.as_str(), key.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| {
                ConfigError::storage(format!("Failed to insert '{}/{}'", domain, key), e)
            })?;

        let mut written = 0usize;
        {
            let mut insert = tx
                .prepare_cached(INSERT_CHUNK)
                .map_err(|e| ConfigError::storage("Failed to prepare chunk insert", e))?;
            let mut chunk = vec![0u8; STREAM_CHUNK_SIZE];
            let mut seq: i64 = 0;
            loop {
                let n = fill_chunk(value, &mut chunk).map_err(|e| {
                    tracing::warn!(
                        "value stream for '{}/{}' failed, rolling back: {}",
                        domain,
                        key,
                        e
                    );
                    ConfigError::storage(
                        format!("Value stream for '{}/{}' failed", domain, key),
                        e,
                    )
                })?;
                if n == 0 {
                    break;
                }
                insert
                    .execute(params![domain.as_str(), key.as_str(), version, seq, &chunk[..n]])
                    .map_err(|e| {
                        ConfigError::storage(
                            format!("Failed to write value of '{}/{}'", domain, key),
                            e,
                        )
                    })?;
                seq += 1;
                written += n;
            }
        }

        tx.commit()
            .map_err(|e| ConfigError::storage("Failed to commit write transaction", e))?;

        tracing::debug!(
            "stored '{}/{}' version {} ({} bytes)",
            domain,
            key,
            version,
            written
        );
        to_version(version)
    }

    fn latest(
        &self,
        domain: &ConfigDomain,
        key: &ConfigKey,
        limit: usize,
    ) -> Result<Vec<StoredEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.pool.get();
        let mut stmt = conn
            .prepare_cached(SELECT_LATEST)
            .map_err(|e| ConfigError::storage("Failed to prepare versioned select", e))?;
        let rows = stmt
            .query_map(params![domain.as_str(), key.as_str(), limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, NaiveDateTime>(1)?,
                    row.get::<_, Option<Vec<u8>>>(2)?,
                ))
            })
            .map_err(|e| {
                ConfigError::storage(format!("Failed to read '{}/{}'", domain, key), e)
            })?;

        let mut entries: Vec<StoredEntry> = Vec::new();
        for row in rows {
            let (version, created, data) = row.map_err(|e| {
                ConfigError::storage("Failed to read row from _configuration", e)
            })?;
            let version = to_version(version)?;
            if entries.last().map(|entry| entry.version) != Some(version) {
                entries.push(StoredEntry {
                    domain: domain.clone(),
                    key: key.clone(),
                    version,
                    created: Utc.from_utc_datetime(&created),
                    value: Vec::new(),
                });
            }
            if let (Some(entry), Some(data)) = (entries.last_mut(), data) {
                entry.value.extend_from_slice(&data);
            }
        }
        Ok(entries)
    }
}

/// Reads until `chunk` is full or the stream ends; returns the number of bytes read.
fn fill_chunk(reader: &mut dyn Read, chunk: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < chunk.len() {
        match reader.read(&mut chunk[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn to_version(raw: i64) -> Result<Version> {
    Version::try_from(raw).map_err(|_| ConfigError::Storage {
        message: format!("Stored version {} is not a positive integer", raw),
        source: None,
    })
}
