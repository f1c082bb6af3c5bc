//! Storage keys, storage values and change-sets as exchanged with the node.
//!
//! Internally every type is a raw byte sequence. At the JSON-RPC boundary
//! they travel as `0x`-prefixed lowercase hex strings, which is what the
//! `Serialize`/`Deserialize` impls produce and accept.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::DecodeError;

/// Encode bytes as a `0x`-prefixed lowercase hex string.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a hex string, with or without the `0x` prefix.
pub fn from_hex(s: &str) -> Result<Vec<u8>, DecodeError> {
    let stripped = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    hex::decode(stripped).map_err(|e| DecodeError::InvalidHex {
        reason: format!("{s:?}: {e}"),
    })
}

macro_rules! hex_bytes {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
        pub struct $name(Vec<u8>);

        impl $name {
            pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
                Self(bytes.into())
            }

            pub fn as_bytes(&self) -> &[u8] {
                &self.0
            }

            pub fn into_bytes(self) -> Vec<u8> {
                self.0
            }

            pub fn len(&self) -> usize {
                self.0.len()
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// `0x`-prefixed lowercase hex form used on the wire.
            pub fn to_hex(&self) -> String {
                to_hex(&self.0)
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(bytes: Vec<u8>) -> Self {
                Self(bytes)
            }
        }

        impl From<&[u8]> for $name {
            fn from(bytes: &[u8]) -> Self {
                Self(bytes.to_vec())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = DecodeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                from_hex(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(&self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}(0x{})", stringify!($name), hex::encode(&self.0))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

hex_bytes!(
    /// Canonical storage location: hashed module prefix, hashed item name and
    /// optional hashed map keys. Equality is byte-exact.
    StorageKey
);

hex_bytes!(
    /// Opaque SCALE-encoded value stored under a [`StorageKey`].
    StorageData
);

/// 32-byte block hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }
}

impl FromStr for BlockHash {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = from_hex(s)?;
        let arr: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| DecodeError::InvalidHex {
            reason: format!("block hash must be 32 bytes, got {}", b.len()),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash(0x{})", hex::encode(self.0))
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// A single `(key, value-or-absence)` pair of a change-set.
/// On the wire this is a two-element array `["0xkey", "0xdata" | null]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(StorageKey, Option<StorageData>)", into = "(StorageKey, Option<StorageData>)")]
pub struct StorageChange {
    pub key: StorageKey,
    /// `None` when the key was removed in this block.
    pub data: Option<StorageData>,
}

impl From<(StorageKey, Option<StorageData>)> for StorageChange {
    fn from((key, data): (StorageKey, Option<StorageData>)) -> Self {
        Self { key, data }
    }
}

impl From<StorageChange> for (StorageKey, Option<StorageData>) {
    fn from(change: StorageChange) -> Self {
        (change.key, change.data)
    }
}

/// All changes to subscribed keys in one block, in the order the node sent them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageChangeSet {
    pub block: BlockHash,
    pub changes: Vec<StorageChange>,
}

impl StorageChangeSet {
    /// Look up the change for `key`.
    ///
    /// Returns `None` if the key is not part of this change-set and
    /// `Some(None)` if the key was deleted.
    pub fn change_for(&self, key: &StorageKey) -> Option<Option<&StorageData>> {
        self.changes
            .iter()
            .find(|c| &c.key == key)
            .map(|c| c.data.as_ref())
    }

    /// Data written under `key` in this block, skipping deletions.
    pub fn data_for(&self, key: &StorageKey) -> Option<&StorageData> {
        self.change_for(key).flatten()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
