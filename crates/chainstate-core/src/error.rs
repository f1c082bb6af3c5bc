//! Error types for the decode and key-derivation pipeline.

use thiserror::Error;

/// Errors raised while reading SCALE-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Unexpected end of input at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Invalid encoding at offset {offset}: {reason}")]
    InvalidEncoding { offset: usize, reason: String },

    #[error("Type {id} not found in registry")]
    TypeNotFound { id: u32 },

    #[error("Trailing bytes: consumed {consumed} of {total}")]
    TrailingBytes { consumed: usize, total: usize },

    #[error("Invalid hex: {reason}")]
    InvalidHex { reason: String },
}

impl DecodeError {
    /// Byte offset at which decoding failed, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::UnexpectedEof { offset, .. } | Self::InvalidEncoding { offset, .. } => {
                Some(*offset)
            }
            Self::TrailingBytes { consumed, .. } => Some(*consumed),
            _ => None,
        }
    }
}

/// Errors from parsing or querying runtime metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("Metadata decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Invalid metadata magic 0x{}", hex::encode(.found))]
    InvalidMagic { found: [u8; 4] },

    #[error("Unsupported metadata version {version}")]
    UnsupportedVersion { version: u8 },

    #[error("Module '{module}' not found")]
    ModuleNotFound { module: String },

    #[error("Module with index {index} not found")]
    ModuleIndexNotFound { index: u8 },

    #[error("Storage item '{module}::{item}' not found")]
    StorageNotFound { module: String, item: String },

    #[error("Event {event_index} of module {module_index} not found")]
    EventNotFound { module_index: u8, event_index: u8 },

    #[error("Call {call_index} of module {module_index} not found")]
    CallNotFound { module_index: u8, call_index: u8 },

    #[error("Constant '{module}::{name}' not found")]
    ConstantNotFound { module: String, name: String },

    #[error("Type {id} of '{context}' is not a variant")]
    NotAVariant { id: u32, context: String },

    #[error(transparent)]
    StorageKey(#[from] StorageKeyError),
}

impl MetadataError {
    /// Returns `true` if a module, item, event, call or constant was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ModuleNotFound { .. }
                | Self::ModuleIndexNotFound { .. }
                | Self::StorageNotFound { .. }
                | Self::EventNotFound { .. }
                | Self::CallNotFound { .. }
                | Self::ConstantNotFound { .. }
        )
    }
}

/// Errors from deriving a storage key for an entry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageKeyError {
    #[error("Storage map '{module}::{item}' requires a map key")]
    MissingMapKey { module: String, item: String },

    #[error("Storage value '{module}::{item}' does not take a map key")]
    UnexpectedMapKey { module: String, item: String },

    #[error("Storage '{module}::{item}' expects {expected} keys, got {got}")]
    KeyCountMismatch {
        module: String,
        item: String,
        expected: usize,
        got: usize,
    },
}

/// Errors from decoding `System::Events` records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventDecodeError {
    #[error("Unknown event {event_index} of module {module_index} (stale metadata?)")]
    UnknownEvent { module_index: u8, event_index: u8 },

    #[error("Event decode failed in record {record}: {source}")]
    Record {
        record: usize,
        #[source]
        source: DecodeError,
    },

    #[error("Event decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Event metadata lookup failed: {0}")]
    Metadata(#[from] MetadataError),
}

impl EventDecodeError {
    /// Returns `true` if the metadata does not know the event, which usually
    /// means the runtime was upgraded and the metadata must be re-fetched.
    pub fn is_unknown_event(&self) -> bool {
        matches!(self, Self::UnknownEvent { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_carries_offset() {
        let err = DecodeError::UnexpectedEof {
            offset: 7,
            needed: 4,
            available: 1,
        };
        assert_eq!(err.offset(), Some(7));
        assert!(err.to_string().contains("offset 7"));
    }

    #[test]
    fn metadata_not_found_classification() {
        let err = MetadataError::StorageNotFound {
            module: "System".into(),
            item: "Nope".into(),
        };
        assert!(err.is_not_found());
        assert!(!MetadataError::UnsupportedVersion { version: 9 }.is_not_found());
    }

    #[test]
    fn key_errors_convert_into_metadata_errors() {
        let err: MetadataError = StorageKeyError::MissingMapKey {
            module: "System".into(),
            item: "Account".into(),
        }
        .into();
        assert!(!err.is_not_found());
        assert_eq!(
            err.to_string(),
            "Storage map 'System::Account' requires a map key"
        );
    }

    #[test]
    fn invalid_magic_display() {
        let err = MetadataError::InvalidMagic {
            found: *b"atem",
        };
        assert_eq!(err.to_string(), "Invalid metadata magic 0x6174656d");
    }
}
