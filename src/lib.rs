// SPDX-License-Identifier: MIT OR Apache-2.0

//! An append-only, versioned key/value configuration store.
//!
//! Callers write arbitrary serializable values under a `(domain, key)` pair. Every write
//! creates a new immutable version instead of overwriting the previous one, and readers ask
//! for the newest `N` versions decoded into a type of their choosing.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain Layer**: Core types (`ConfigDomain`, `ConfigKey`, `ConfigEntry`, `Codec`, errors)
//! - **Ports**: The `VersionedStore` trait every storage backend implements
//! - **Adapters**: SQLite and in-memory stores
//! - **Service**: The typed `ConfigStore` façade, the per-domain `ConfigRegistry`, and the
//!   streaming serializer that feeds values to the store through a bounded pipe
//!
//! # Guarantees
//!
//! - Versions of one `(domain, key)` are exactly `1..=n`, even under concurrent writers:
//!   the store allocates and inserts in one atomic step.
//! - A row is visible only with its complete payload.
//! - Encoding runs on a worker thread into a fixed-size pipe, so memory stays bounded by the
//!   pipe capacity while large values stream into storage. `set` still returns only once the
//!   value is stored or has failed.
//! - "Nothing stored" is an empty result, never an error; a payload that does not decode as
//!   the requested type is a [`ConfigError::Deserialization`](domain::ConfigError).
//!
//! # Feature Flags
//!
//! - `sqlite`: Enable the SQLite store (default)
//! - `yaml`: Enable the YAML codec and YAML store configuration (default)
//! - `full`: Enable all features
//!
//! # Quick Start
//!
//! ```rust
//! use verscfg::prelude::*;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let registry = ConfigRegistry::new(ConfigStore::new(MemoryStore::new()));
//! let db = registry.get_config("database");
//!
//! db.set("pool_size", 8u32)?;
//! db.set("pool_size", 16u32)?;
//!
//! assert_eq!(db.get("pool_size", 4u32)?, vec![16]);
//! assert_eq!(db.get_versions("pool_size", 4u32, 10)?, vec![16, 8]);
//! assert_eq!(db.get("timeout_ms", 500u64)?, vec![500]);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for convenient access.
pub mod prelude {
    pub use crate::domain::{
        Codec, ConfigDomain, ConfigEntry, ConfigError, ConfigKey, Result, Version,
    };
    pub use crate::ports::VersionedStore;
    pub use crate::service::{ConfigHandle, ConfigRegistry, ConfigStore, ConfigStoreBuilder};

    pub use crate::adapters::MemoryStore;
    #[cfg(feature = "sqlite")]
    pub use crate::adapters::{SqliteStore, SqliteStoreConfig};
}
