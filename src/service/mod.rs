// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer containing the read/write façade and its plumbing.
//!
//! This module contains the typed `ConfigStore` façade, the per-domain registry, and the
//! streaming serializer with its bounded pipe.

pub mod config_store;
pub mod pipe;
pub mod registry;
pub mod serializer;

// Re-export commonly used types
pub use config_store::{ConfigStore, ConfigStoreBuilder};
pub use pipe::DEFAULT_PIPE_CAPACITY;
pub use registry::{get_config, global, install, ConfigHandle, ConfigRegistry};
pub use serializer::StreamingSerializer;
