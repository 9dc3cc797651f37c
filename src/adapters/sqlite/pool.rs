// SPDX-License-Identifier: MIT OR Apache-2.0

//! A fixed-size pool of SQLite connections.
//!
//! Connections are opened up front. [`ConnectionPool::get`] blocks until one is idle and
//! hands it out inside a [`PooledConnection`] guard that puts it back on drop, on every
//! exit path including unwinding.

use super::config::SqliteStoreConfig;
use crate::domain::{ConfigError, Result};
use rusqlite::{Connection, OpenFlags};
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

/// A fixed set of open connections to one database file.
#[derive(Debug)]
pub struct ConnectionPool {
    idle: Mutex<Vec<Connection>>,
    returned: Condvar,
    size: usize,
}

impl ConnectionPool {
    /// Opens `config.pool_size` connections to `config.path`.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self> {
        config.validate()?;
        let mut idle = Vec::with_capacity(config.pool_size);
        for _ in 0..config.pool_size {
            idle.push(open_connection(config)?);
        }
        tracing::debug!(
            "opened {} SQLite connections to '{}'",
            config.pool_size,
            config.path.display()
        );
        Ok(Self {
            idle: Mutex::new(idle),
            returned: Condvar::new(),
            size: config.pool_size,
        })
    }

    /// Returns the number of connections the pool owns.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Takes an idle connection, waiting for one to be returned if none is idle.
    pub fn get(&self) -> PooledConnection<'_> {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(conn) = idle.pop() {
                return PooledConnection {
                    pool: self,
                    conn: Some(conn),
                };
            }
            idle = self
                .returned
                .wait(idle)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn put_back(&self, conn: Connection) {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(conn);
        self.returned.notify_one();
    }
}

/// A connection checked out of a [`ConnectionPool`].
#[derive(Debug)]
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    conn: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.conn.as_ref().expect("connection is held until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection is held until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.put_back(conn);
        }
    }
}

fn open_connection(config: &SqliteStoreConfig) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(&config.path, flags).map_err(|e| {
        ConfigError::storage(
            format!("Failed to open '{}'", config.path.display()),
            e,
        )
    })?;
    conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|e| ConfigError::storage("Failed to set busy timeout", e))?;
    conn.execute_batch(&format!(
        "PRAGMA journal_mode = {};",
        config.journal_mode.pragma_value()
    ))
    .map_err(|e| ConfigError::storage("Failed to set journal mode", e))?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn pool(size: usize) -> (TempDir, ConnectionPool) {
        let dir = TempDir::new().unwrap();
        let config = SqliteStoreConfig::new(dir.path().join("pool.sqlite3")).with_pool_size(size);
        let pool = ConnectionPool::open(&config).unwrap();
        (dir, pool)
    }

    #[test]
    fn test_open_creates_all_connections() {
        let (_dir, pool) = pool(3);
        assert_eq!(pool.size(), 3);
        let a = pool.get();
        let b = pool.get();
        let c = pool.get();
        let one: i64 = a.query_row("SELECT 1", [], |row| row.get(0)).unwrap();
        assert_eq!(one, 1);
        drop((a, b, c));
        assert_eq!(pool.idle.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_connection_returned_on_panic() {
        let (_dir, pool) = pool(1);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _conn = pool.get();
            panic!("mid-operation failure");
        }));
        assert!(result.is_err());
        assert_eq!(pool.idle.lock().unwrap_or_else(PoisonError::into_inner).len(), 1);
    }

    #[test]
    fn test_get_waits_for_return() {
        let (_dir, pool) = pool(1);
        let pool = Arc::new(pool);
        let held = pool.get();

        let waiter = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let conn = pool.get();
                conn.query_row("SELECT 2", [], |row| row.get::<_, i64>(0))
                    .unwrap()
            })
        };
        thread::sleep(Duration::from_millis(50));
        assert!(!waiter.is_finished());
        drop(held);
        assert_eq!(waiter.join().unwrap(), 2);
    }

    #[test]
    fn test_open_rejects_zero_pool_size() {
        let dir = TempDir::new().unwrap();
        let config = SqliteStoreConfig::new(dir.path().join("x.sqlite3")).with_pool_size(0);
        assert!(ConnectionPool::open(&config).is_err());
    }

    #[test]
    fn test_open_reports_storage_error_for_bad_path() {
        let dir = TempDir::new().unwrap();
        let config = SqliteStoreConfig::new(dir.path().join("missing").join("x.sqlite3"));
        let err = ConnectionPool::open(&config).unwrap_err();
        assert!(err.is_storage());
    }
}
