// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer containing storage backend implementations.
//!
//! This module contains concrete implementations of the `VersionedStore` port defined in
//! the ports layer.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteStore, SqliteStoreConfig};
