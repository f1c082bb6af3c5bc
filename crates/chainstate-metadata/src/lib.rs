//! # chainstate-metadata
//!
//! Runtime metadata as a schema. A node describes its own storage layout,
//! calls and events in a self-describing metadata document; this crate
//! parses that document once into an immutable [`MetadataIndex`] and uses it
//! to:
//!
//! - derive canonical storage keys ([`StorageKeyDeriver`]),
//! - decode storage values and constants with the declared types,
//! - decode the `System::Events` record list ([`EventDecoder`]).
//!
//! ```text
//! state_getMetadata ──► MetadataIndex::parse ──► Arc<MetadataIndex>
//!                                                  │
//!        resolve_storage ──► StorageKeyDeriver ◄───┤
//!        resolve_event   ──► EventDecoder      ◄───┘
//! ```

pub mod events;
pub mod hasher;
pub mod index;
pub mod key;
mod parse;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use events::{EventDecoder, EventRecord, Phase};
pub use hasher::StorageHasher;
pub use index::{
    CallDescriptor, ConstantMetadata, EventTypeDescriptor, MetadataIndex, ModuleMetadata,
    StorageEntryMetadata, StorageKind, StorageModifier, VariantDescriptor,
};
pub use key::StorageKeyDeriver;
pub use parse::{MAGIC, SUPPORTED_VERSIONS};
