//! # chainstate-scale
//!
//! A dynamic SCALE codec driven by runtime type descriptors.
//!
//! Substrate runtimes describe their binary layouts in metadata rather than in
//! Rust types available at compile time. This crate decodes bytes against a
//! [`TypeRegistry`] of [`TypeDef`] descriptors into a dynamic [`Value`], and
//! encodes any [`Value`] back to bytes.
//!
//! ```text
//! bytes ──► Cursor ──► decode_value(TypeId, &TypeRegistry) ──► Value
//! Value ──► encode ──► bytes
//! ```
//!
//! Compact integers are decoded strictly: a value that is not in its
//! smallest encoding class is rejected with `InvalidEncoding`.

pub mod compact;
pub mod cursor;
pub mod decode;
pub mod encode;
pub mod registry;
pub mod value;

pub use chainstate_core::error::DecodeError;
pub use compact::{decode_compact, encode_compact};
pub use cursor::Cursor;
pub use decode::{decode, decode_all, decode_value};
pub use encode::{encode, encode_to};
pub use registry::{Field, Primitive, TypeDef, TypeId, TypeInfo, TypeParam, TypeRegistry, Variant};
pub use value::Value;
