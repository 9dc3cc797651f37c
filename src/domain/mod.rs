// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing core types.
//!
//! This module contains the identifiers, entries, encodings and errors of the versioned
//! configuration store. It is independent of any storage engine.

pub mod codec;
pub mod config_entry;
pub mod config_key;
pub mod errors;

// Re-export commonly used types
pub use codec::{Codec, CodecError};
pub use config_entry::{ConfigEntry, StoredEntry, Version};
pub use config_key::{ConfigDomain, ConfigKey, MAX_IDENTIFIER_LEN};
pub use errors::{ConfigError, Result};
