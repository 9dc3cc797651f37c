// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! This module contains the trait definitions (ports) that storage backends implement.
//! The implementations live in the adapters layer.

pub mod store;

// Re-export commonly used types
pub use store::VersionedStore;
