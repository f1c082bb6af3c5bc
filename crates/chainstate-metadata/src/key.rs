//! Storage key derivation.
//!
//! ```text
//! key = twox128(prefix) ++ twox128(item) ++ hasher_1(k_1) ++ ... ++ hasher_n(k_n)
//! ```
//!
//! Each map key is hashed on its own with the hasher declared for its
//! position. Map keys are passed already SCALE-encoded.

use chainstate_core::error::StorageKeyError;
use chainstate_core::types::StorageKey;

use crate::hasher::twox_128;
use crate::index::StorageEntryMetadata;

/// Derives canonical storage keys from storage entry metadata.
pub struct StorageKeyDeriver;

impl StorageKeyDeriver {
    /// The 32-byte prefix shared by every key of `entry`. For a plain value
    /// this is the full key; for a map it is the iteration prefix.
    pub fn prefix(entry: &StorageEntryMetadata) -> StorageKey {
        let mut key = Vec::with_capacity(32);
        key.extend_from_slice(&twox_128(entry.prefix.as_bytes()));
        key.extend_from_slice(&twox_128(entry.name.as_bytes()));
        StorageKey::new(key)
    }

    /// Key for a plain value (`map_key == None`) or a single-key map.
    pub fn derive(
        entry: &StorageEntryMetadata,
        map_key: Option<&[u8]>,
    ) -> Result<StorageKey, StorageKeyError> {
        match map_key {
            Some(k) => Self::derive_keys(entry, &[k]),
            None => Self::derive_keys(entry, &[]),
        }
    }

    /// Key for a double map.
    pub fn derive_double(
        entry: &StorageEntryMetadata,
        key1: &[u8],
        key2: &[u8],
    ) -> Result<StorageKey, StorageKeyError> {
        Self::derive_keys(entry, &[key1, key2])
    }

    /// Key for an entry with any number of map keys.
    pub fn derive_keys(
        entry: &StorageEntryMetadata,
        keys: &[&[u8]],
    ) -> Result<StorageKey, StorageKeyError> {
        let expected = entry.key_count();
        if keys.len() != expected {
            let (module, item) = (entry.prefix.clone(), entry.name.clone());
            return Err(match (expected, keys.len()) {
                (0, _) => StorageKeyError::UnexpectedMapKey { module, item },
                (_, 0) => StorageKeyError::MissingMapKey { module, item },
                (expected, got) => StorageKeyError::KeyCountMismatch {
                    module,
                    item,
                    expected,
                    got,
                },
            });
        }

        let mut key = Self::prefix(entry).into_bytes();
        for (hasher, k) in entry.hashers.iter().zip(keys) {
            key.extend_from_slice(&hasher.hash(k));
        }
        Ok(StorageKey::new(key))
    }
}
