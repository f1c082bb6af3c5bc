//! # chainstate-core
//!
//! Shared primitives for the chainstate crates: the wire-level storage types
//! exchanged with a Substrate node (`StorageKey`, `StorageData`,
//! `StorageChangeSet`, `BlockHash`) and the error taxonomy used by the codec,
//! the metadata index, key derivation and event decoding.

pub mod error;
pub mod types;

pub use error::{DecodeError, EventDecodeError, MetadataError, StorageKeyError};
pub use types::{BlockHash, StorageChange, StorageChangeSet, StorageData, StorageKey};
