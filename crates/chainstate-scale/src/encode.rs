//! Encoding of dynamic values.
//!
//! The encoder needs no type descriptor: every [`Value`] variant determines
//! its own layout. Decoding a value and encoding it again yields the original
//! bytes.

use crate::compact::encode_compact;
use crate::value::Value;

/// Encode `value` into a fresh buffer.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_to(value, &mut out);
    out
}

/// Append the encoding of `value` to `out`.
pub fn encode_to(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Bool(v) => out.push(u8::from(*v)),
        Value::Char(c) => out.extend_from_slice(&u32::from(*c).to_le_bytes()),
        Value::Str(s) => encode_bytes(s.as_bytes(), out),
        Value::U8(v) => out.push(*v),
        Value::U16(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::U128(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::I8(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::I16(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::I32(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::I64(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::I128(v) => out.extend_from_slice(&v.to_le_bytes()),
        Value::U256(b) | Value::I256(b) => out.extend_from_slice(b),
        Value::Compact(v) => encode_compact(*v, out),
        Value::Bytes(b) => encode_bytes(b, out),
        Value::ByteArray(b) => out.extend_from_slice(b),
        Value::Sequence(items) => {
            encode_compact(items.len() as u128, out);
            items.iter().for_each(|v| encode_to(v, out));
        }
        Value::Array(items) | Value::Tuple(items) => items.iter().for_each(|v| encode_to(v, out)),
        Value::Composite(fields) => fields.iter().for_each(|(_, v)| encode_to(v, out)),
        Value::Variant { index, fields, .. } => {
            out.push(*index);
            fields.iter().for_each(|(_, v)| encode_to(v, out));
        }
        Value::BitSequence { bits, data } => {
            encode_compact(u128::from(*bits), out);
            out.extend_from_slice(data);
        }
    }
}

/// Append a compact length prefix followed by `bytes`.
pub fn encode_bytes(bytes: &[u8], out: &mut Vec<u8>) {
    encode_compact(bytes.len() as u128, out);
    out.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parity_scale_codec::{Compact, Encode};

    #[test]
    fn matches_reference_encoding() {
        let value = Value::Composite(vec![
            (Some("who".into()), Value::ByteArray(vec![0xd4; 32])),
            (Some("amount".into()), Value::U128(10_000)),
            (Some("memo".into()), Value::Str("tip".into())),
            (Some("tip".into()), Value::Compact(1_000_000)),
        ]);
        let expected = ([0xd4u8; 32], 10_000u128, "tip".to_string(), Compact(1_000_000u64)).encode();
        assert_eq!(encode(&value), expected);
    }

    #[test]
    fn sequences_are_prefixed_arrays_are_not() {
        let seq = Value::Sequence(vec![Value::U16(1), Value::U16(2)]);
        let arr = Value::Array(vec![Value::U16(1), Value::U16(2)]);
        assert_eq!(encode(&seq), vec![1u16, 2].encode());
        assert_eq!(encode(&arr), [1u16, 2].encode());
    }

    #[test]
    fn option_as_variant() {
        let some = Value::Variant {
            index: 1,
            name: "Some".into(),
            fields: vec![(None, Value::U32(9))],
        };
        assert_eq!(encode(&some), Some(9u32).encode());
        assert_eq!(encode(&Value::Bool(false)), false.encode());
        assert_eq!(encode(&Value::I16(-2)), (-2i16).encode());
    }

    #[test]
    fn encode_to_appends() {
        let mut out = vec![0xff];
        encode_to(&Value::Bytes(vec![1, 2]), &mut out);
        assert_eq!(out, vec![0xff, 0x08, 1, 2]);
    }
}
