//! Dynamic SCALE values.
//!
//! A `Value` carries enough shape to be re-encoded without its type
//! descriptor: `Bytes` is length-prefixed while `ByteArray` is not, `Sequence`
//! is length-prefixed while `Array` is not, and so on.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Bool(bool),
    Char(char),
    Str(String),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    /// Little-endian 256-bit unsigned integer.
    U256([u8; 32]),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    /// Little-endian two's complement 256-bit integer.
    I256([u8; 32]),
    Compact(u128),
    /// `Vec<u8>`: compact length prefix plus raw bytes.
    Bytes(Vec<u8>),
    /// `[u8; N]`: raw bytes, no prefix.
    ByteArray(Vec<u8>),
    Sequence(Vec<Value>),
    Array(Vec<Value>),
    Tuple(Vec<Value>),
    Composite(Vec<(Option<String>, Value)>),
    Variant {
        index: u8,
        name: String,
        fields: Vec<(Option<String>, Value)>,
    },
    BitSequence {
        bits: u32,
        data: Vec<u8>,
    },
}

impl Value {
    /// Any unsigned integer (fixed-width or compact) that fits in a `u128`.
    pub fn as_u128(&self) -> Option<u128> {
        match self {
            Self::U8(v) => Some(u128::from(*v)),
            Self::U16(v) => Some(u128::from(*v)),
            Self::U32(v) => Some(u128::from(*v)),
            Self::U64(v) => Some(u128::from(*v)),
            Self::U128(v) | Self::Compact(v) => Some(*v),
            _ => None,
        }
    }

    /// Raw bytes of a `Bytes` or `ByteArray` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) | Self::ByteArray(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a named field of a composite or variant.
    pub fn field(&self, name: &str) -> Option<&Value> {
        let fields = match self {
            Self::Composite(fields) | Self::Variant { fields, .. } => fields,
            _ => return None,
        };
        fields
            .iter()
            .find(|(n, _)| n.as_deref() == Some(name))
            .map(|(_, v)| v)
    }

    /// Name of the selected variant, if this is a variant.
    pub fn variant_name(&self) -> Option<&str> {
        match self {
            Self::Variant { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Elements of a sequence, array or tuple.
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(v) | Self::Array(v) | Self::Tuple(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Char(v) => write!(f, "{v:?}"),
            Self::Str(v) => write!(f, "{v:?}"),
            Self::U8(v) => write!(f, "{v}"),
            Self::U16(v) => write!(f, "{v}"),
            Self::U32(v) => write!(f, "{v}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::U128(v) | Self::Compact(v) => write!(f, "{v}"),
            Self::I8(v) => write!(f, "{v}"),
            Self::I16(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::I128(v) => write!(f, "{v}"),
            Self::U256(b) | Self::I256(b) => write!(f, "0x{}", hex::encode(b)),
            Self::Bytes(b) | Self::ByteArray(b) => write!(f, "0x{}", hex::encode(b)),
            Self::BitSequence { bits, data } => write!(f, "bits[{bits}]0x{}", hex::encode(data)),
            Self::Sequence(v) | Self::Array(v) | Self::Tuple(v) => {
                let parts: Vec<_> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Composite(fields) => write!(f, "{{{}}}", fmt_fields(fields)),
            Self::Variant { name, fields, .. } if fields.is_empty() => write!(f, "{name}"),
            Self::Variant { name, fields, .. } => write!(f, "{name}({})", fmt_fields(fields)),
        }
    }
}

fn fmt_fields(fields: &[(Option<String>, Value)]) -> String {
    fields
        .iter()
        .map(|(name, v)| match name {
            Some(n) => format!("{n}: {v}"),
            None => v.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
