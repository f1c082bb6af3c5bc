//! Storage hashers.
//!
//! xxHash-based `Twox*` hashers are fast but not collision resistant; FRAME
//! only uses them on keys the caller cannot choose freely. `Blake2_*` hashers
//! are cryptographic. The `*Concat` variants and `Identity` keep the raw key
//! in the storage key so it can be recovered when iterating a map.

use blake2::digest::consts::{U16, U32};
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Key hasher declared by a storage map entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageHasher {
    Blake2_128,
    Blake2_256,
    Blake2_128Concat,
    Twox128,
    Twox256,
    Twox64Concat,
    Identity,
}

impl StorageHasher {
    /// Map the metadata discriminant to a hasher.
    pub fn from_discriminant(d: u8) -> Option<Self> {
        Some(match d {
            0 => Self::Blake2_128,
            1 => Self::Blake2_256,
            2 => Self::Blake2_128Concat,
            3 => Self::Twox128,
            4 => Self::Twox256,
            5 => Self::Twox64Concat,
            6 => Self::Identity,
            _ => return None,
        })
    }

    pub fn discriminant(self) -> u8 {
        match self {
            Self::Blake2_128 => 0,
            Self::Blake2_256 => 1,
            Self::Blake2_128Concat => 2,
            Self::Twox128 => 3,
            Self::Twox256 => 4,
            Self::Twox64Concat => 5,
            Self::Identity => 6,
        }
    }

    /// Returns `true` if the raw key follows the hash in the storage key.
    pub fn is_concat(self) -> bool {
        matches!(
            self,
            Self::Blake2_128Concat | Self::Twox64Concat | Self::Identity
        )
    }

    /// Width of the hash part alone.
    pub fn hash_len(self) -> usize {
        match self {
            Self::Identity => 0,
            Self::Twox64Concat => 8,
            Self::Blake2_128 | Self::Blake2_128Concat | Self::Twox128 => 16,
            Self::Blake2_256 | Self::Twox256 => 32,
        }
    }

    /// Length of [`StorageHasher::hash`] output for a key of `key_len` bytes.
    pub fn output_len(self, key_len: usize) -> usize {
        if self.is_concat() {
            self.hash_len() + key_len
        } else {
            self.hash_len()
        }
    }

    /// Hash `key`, appending the raw key for concat hashers.
    pub fn hash(self, key: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.output_len(key.len()));
        match self {
            Self::Blake2_128 => out.extend_from_slice(&blake2_128(key)),
            Self::Blake2_256 => out.extend_from_slice(&blake2_256(key)),
            Self::Blake2_128Concat => {
                out.extend_from_slice(&blake2_128(key));
                out.extend_from_slice(key);
            }
            Self::Twox128 => out.extend_from_slice(&twox_128(key)),
            Self::Twox256 => out.extend_from_slice(&twox_256(key)),
            Self::Twox64Concat => {
                out.extend_from_slice(&twox_64(key));
                out.extend_from_slice(key);
            }
            Self::Identity => out.extend_from_slice(key),
        }
        out
    }
}

/// xxHash64 with seeds `0..N`, little-endian outputs concatenated.
fn twox<const N: usize>(data: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    for (seed, chunk) in out.chunks_exact_mut(8).enumerate() {
        let mut h = XxHash64::with_seed(seed as u64);
        h.write(data);
        chunk.copy_from_slice(&h.finish().to_le_bytes());
    }
    out
}

pub fn twox_64(data: &[u8]) -> [u8; 8] {
    twox(data)
}

pub fn twox_128(data: &[u8]) -> [u8; 16] {
    twox(data)
}

pub fn twox_256(data: &[u8]) -> [u8; 32] {
    twox(data)
}

pub fn blake2_128(data: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&Blake2b::<U16>::digest(data));
    out
}

pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Blake2b::<U32>::digest(data));
    out
}
