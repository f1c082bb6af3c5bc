//! Descriptor-driven decoding.

use chainstate_core::error::DecodeError;

use crate::cursor::Cursor;
use crate::registry::{Primitive, TypeDef, TypeId, TypeRegistry};
use crate::value::Value;

/// Nesting limit for a single decode. Well-formed runtime types stay far
/// below it; a self-referential composite without a variant in between would
/// otherwise recurse without consuming input.
const MAX_DEPTH: usize = 256;

/// Decode one value of type `ty` from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed. Trailing input is
/// left untouched; see [`decode_all`] for the strict form.
pub fn decode(
    bytes: &[u8],
    ty: TypeId,
    registry: &TypeRegistry,
) -> Result<(Value, usize), DecodeError> {
    let mut cursor = Cursor::new(bytes);
    let value = decode_value(&mut cursor, ty, registry)?;
    Ok((value, cursor.offset()))
}

/// Decode `bytes` as exactly one value of type `ty`.
pub fn decode_all(bytes: &[u8], ty: TypeId, registry: &TypeRegistry) -> Result<Value, DecodeError> {
    let mut cursor = Cursor::new(bytes);
    let value = decode_value(&mut cursor, ty, registry)?;
    cursor.finish()?;
    Ok(value)
}

/// Decode one value of type `ty` at the cursor position, leaving the cursor
/// just past it.
pub fn decode_value(
    cursor: &mut Cursor<'_>,
    ty: TypeId,
    registry: &TypeRegistry,
) -> Result<Value, DecodeError> {
    Decoder { registry, depth: 0 }.value(cursor, ty)
}

struct Decoder<'r> {
    registry: &'r TypeRegistry,
    depth: usize,
}

impl Decoder<'_> {
    fn value(&mut self, cursor: &mut Cursor<'_>, ty: TypeId) -> Result<Value, DecodeError> {
        if self.depth >= MAX_DEPTH {
            return Err(cursor.invalid(
                cursor.offset(),
                format!("type nesting exceeds {MAX_DEPTH} levels"),
            ));
        }
        self.depth += 1;
        let out = self.value_inner(cursor, ty);
        self.depth -= 1;
        out
    }

    fn value_inner(&mut self, cursor: &mut Cursor<'_>, ty: TypeId) -> Result<Value, DecodeError> {
        let info = self.registry.resolve(ty)?;
        match &info.def {
            TypeDef::Primitive(p) => primitive(cursor, *p),
            TypeDef::Compact(inner) => self.compact(cursor, *inner),
            TypeDef::Sequence(elem) => {
                let len = cursor.read_len()?;
                if self.registry.is_byte(*elem) {
                    return Ok(Value::Bytes(cursor.read_bytes(len)?.to_vec()));
                }
                if len == 0 {
                    return Ok(Value::Sequence(Vec::new()));
                }
                let mut items = Vec::with_capacity(len.min(cursor.remaining()));
                for _ in 0..len {
                    items.push(self.value(cursor, *elem)?);
                }
                Ok(Value::Sequence(items))
            }
            TypeDef::Array { len, elem } => {
                let len = *len as usize;
                if self.registry.is_byte(*elem) {
                    return Ok(Value::ByteArray(cursor.read_bytes(len)?.to_vec()));
                }
                let mut items = Vec::with_capacity(len.min(cursor.remaining()));
                for _ in 0..len {
                    items.push(self.value(cursor, *elem)?);
                }
                Ok(Value::Array(items))
            }
            TypeDef::Tuple(ids) => ids
                .iter()
                .map(|id| self.value(cursor, *id))
                .collect::<Result<_, _>>()
                .map(Value::Tuple),
            TypeDef::Composite(fields) => fields
                .iter()
                .map(|f| Ok((f.name.clone(), self.value(cursor, f.ty)?)))
                .collect::<Result<_, DecodeError>>()
                .map(Value::Composite),
            TypeDef::Variant(variants) => {
                let at = cursor.offset();
                let index = cursor.read_u8()?;
                let variant = variants.iter().find(|v| v.index == index).ok_or_else(|| {
                    cursor.invalid(
                        at,
                        format!(
                            "discriminant {index} out of range for {}",
                            info.path_string().unwrap_or_else(|| format!("type {ty}"))
                        ),
                    )
                })?;
                let fields = variant
                    .fields
                    .iter()
                    .map(|f| Ok((f.name.clone(), self.value(cursor, f.ty)?)))
                    .collect::<Result<_, DecodeError>>()?;
                Ok(Value::Variant {
                    index,
                    name: variant.name.clone(),
                    fields,
                })
            }
            TypeDef::BitSequence { store, .. } => {
                let at = cursor.offset();
                let bits = cursor.read_len()?;
                let width = match &self.registry.resolve(*store)?.def {
                    TypeDef::Primitive(p @ (Primitive::U8 | Primitive::U16 | Primitive::U32 | Primitive::U64)) => {
                        p.width().unwrap_or(1)
                    }
                    other => {
                        return Err(cursor.invalid(at, format!("unsupported bit store {other:?}")));
                    }
                };
                let words = bits.div_ceil(8 * width);
                let data = cursor.read_bytes(words * width)?.to_vec();
                Ok(Value::BitSequence {
                    bits: bits as u32,
                    data,
                })
            }
        }
    }

    /// `Compact<T>` where `T` is an unsigned primitive, or a single-field
    /// wrapper around one (e.g. `Compact<Perbill>`).
    fn compact(&mut self, cursor: &mut Cursor<'_>, inner: TypeId) -> Result<Value, DecodeError> {
        let at = cursor.offset();
        let mut target = inner;
        for _ in 0..MAX_DEPTH {
            match &self.registry.resolve(target)?.def {
                TypeDef::Primitive(p) if p.is_unsigned() => {
                    let value = cursor.read_compact()?;
                    let bits = p.width().unwrap_or(16) * 8;
                    if bits < 128 && value >> bits != 0 {
                        return Err(cursor.invalid(
                            at,
                            format!("compact value {value} overflows {bits}-bit target"),
                        ));
                    }
                    return Ok(Value::Compact(value));
                }
                TypeDef::Composite(fields) if fields.len() == 1 => target = fields[0].ty,
                TypeDef::Tuple(ids) if ids.len() == 1 => target = ids[0],
                TypeDef::Composite(fields) if fields.is_empty() => {
                    return Ok(Value::Composite(Vec::new()))
                }
                TypeDef::Tuple(ids) if ids.is_empty() => return Ok(Value::Tuple(Vec::new())),
                other => {
                    return Err(cursor.invalid(at, format!("type {other:?} cannot be compact")));
                }
            }
        }
        Err(cursor.invalid(at, format!("cyclic compact wrapper at type {inner}")))
    }
}

fn primitive(cursor: &mut Cursor<'_>, p: Primitive) -> Result<Value, DecodeError> {
    let at = cursor.offset();
    Ok(match p {
        Primitive::Bool => Value::Bool(cursor.read_bool()?),
        Primitive::Char => {
            let raw = cursor.read_u32()?;
            Value::Char(
                char::from_u32(raw)
                    .ok_or_else(|| cursor.invalid(at, format!("invalid char 0x{raw:x}")))?,
            )
        }
        Primitive::Str => Value::Str(cursor.read_str()?),
        Primitive::U8 => Value::U8(cursor.read_u8()?),
        Primitive::U16 => Value::U16(cursor.read_u16()?),
        Primitive::U32 => Value::U32(cursor.read_u32()?),
        Primitive::U64 => Value::U64(cursor.read_u64()?),
        Primitive::U128 => Value::U128(cursor.read_u128()?),
        Primitive::U256 => Value::U256(cursor.read_array()?),
        Primitive::I8 => Value::I8(i8::from_le_bytes(cursor.read_array()?)),
        Primitive::I16 => Value::I16(i16::from_le_bytes(cursor.read_array()?)),
        Primitive::I32 => Value::I32(i32::from_le_bytes(cursor.read_array()?)),
        Primitive::I64 => Value::I64(i64::from_le_bytes(cursor.read_array()?)),
        Primitive::I128 => Value::I128(i128::from_le_bytes(cursor.read_array()?)),
        Primitive::I256 => Value::I256(cursor.read_array()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode;
    use crate::registry::{Field, TypeInfo, Variant};
    use parity_scale_codec::{Compact, Decode, Encode};

    #[derive(Encode, Decode, Debug, PartialEq)]
    struct AccountData {
        free: u128,
        reserved: u128,
    }

    #[derive(Encode, Decode, Debug, PartialEq)]
    struct AccountInfo {
        nonce: u32,
        consumers: u32,
        data: AccountData,
    }

    #[derive(Encode, Decode, Debug, PartialEq)]
    enum Status {
        Idle,
        Busy(u8),
        Named { label: String },
    }

    struct Types {
        reg: TypeRegistry,
        u8_: TypeId,
        u32_: TypeId,
        u128_: TypeId,
        bytes: TypeId,
        hash: TypeId,
        account_info: TypeId,
        status: TypeId,
        status_vec: TypeId,
        compact_u32: TypeId,
        pair: TypeId,
    }

    fn types() -> Types {
        let mut reg = TypeRegistry::new();
        let u8_ = reg.push(TypeDef::Primitive(Primitive::U8));
        let u32_ = reg.push(TypeDef::Primitive(Primitive::U32));
        let u128_ = reg.push(TypeDef::Primitive(Primitive::U128));
        let str_ = reg.push(TypeDef::Primitive(Primitive::Str));
        let bytes = reg.push(TypeDef::Sequence(u8_));
        let hash = reg.push(TypeDef::Array { len: 32, elem: u8_ });
        let account_data = reg.push_named(
            &["pallet_balances", "AccountData"],
            TypeDef::Composite(vec![Field::named("free", u128_), Field::named("reserved", u128_)]),
        );
        let account_info = reg.push_named(
            &["frame_system", "AccountInfo"],
            TypeDef::Composite(vec![
                Field::named("nonce", u32_),
                Field::named("consumers", u32_),
                Field::named("data", account_data),
            ]),
        );
        let status = reg.push_named(
            &["demo", "Status"],
            TypeDef::Variant(vec![
                Variant::new(0, "Idle", vec![]),
                Variant::new(1, "Busy", vec![Field::unnamed(u8_)]),
                Variant::new(2, "Named", vec![Field::named("label", str_)]),
            ]),
        );
        let status_vec = reg.push(TypeDef::Sequence(status));
        let compact_u32 = reg.push(TypeDef::Compact(u32_));
        let pair = reg.push(TypeDef::Tuple(vec![u32_, hash]));
        Types {
            reg,
            u8_,
            u32_,
            u128_,
            bytes,
            hash,
            account_info,
            status,
            status_vec,
            compact_u32,
            pair,
        }
    }

    #[test]
    fn struct_fields_in_declaration_order() {
        let t = types();
        let info = AccountInfo {
            nonce: 7,
            consumers: 1,
            data: AccountData {
                free: 1_000_000_000_000,
                reserved: 5,
            },
        };
        let bytes = info.encode();
        let (value, consumed) = decode(&bytes, t.account_info, &t.reg).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(value.field("nonce"), Some(&Value::U32(7)));
        let free = value.field("data").and_then(|d| d.field("free"));
        assert_eq!(free, Some(&Value::U128(1_000_000_000_000)));
        assert_eq!(encode(&value), bytes);
    }

    #[test]
    fn composite_leaves_cursor_at_next_field() {
        let t = types();
        let mut bytes = 42u32.encode();
        bytes.extend([0x11u8; 32]);
        bytes.push(0xee);
        let mut cursor = Cursor::new(&bytes);
        let value = decode_value(&mut cursor, t.pair, &t.reg).unwrap();
        assert_eq!(cursor.offset(), 36);
        assert_eq!(cursor.rest(), &[0xee]);
        assert_eq!(
            value,
            Value::Tuple(vec![Value::U32(42), Value::ByteArray(vec![0x11; 32])])
        );
    }

    #[test]
    fn enum_variants() {
        let t = types();
        let statuses = vec![
            Status::Idle,
            Status::Busy(9),
            Status::Named {
                label: "x".into(),
            },
        ];
        let bytes = statuses.encode();
        let value = decode_all(&bytes, t.status_vec, &t.reg).unwrap();
        let items = value.items().unwrap();
        assert_eq!(items[0].variant_name(), Some("Idle"));
        assert_eq!(
            items[1],
            Value::Variant {
                index: 1,
                name: "Busy".into(),
                fields: vec![(None, Value::U8(9))]
            }
        );
        assert_eq!(items[2].field("label").and_then(Value::as_str), Some("x"));
        assert_eq!(encode(&value), bytes);
    }

    #[test]
    fn out_of_range_discriminant_is_invalid() {
        let t = types();
        let err = decode_all(&[0x03], t.status, &t.reg).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidEncoding { offset: 0, .. }), "{err:?}");
    }

    #[test]
    fn byte_sequences_and_arrays() {
        let t = types();
        let payload = vec![1u8, 2, 3];
        let value = decode_all(&payload.encode(), t.bytes, &t.reg).unwrap();
        assert_eq!(value, Value::Bytes(payload));

        let hash = [0xabu8; 32];
        let value = decode_all(&hash, t.hash, &t.reg).unwrap();
        assert_eq!(value.as_bytes(), Some(&hash[..]));
    }

    #[test]
    fn empty_sequence_consumes_only_prefix() {
        let mut reg = TypeRegistry::new();
        // Element type 99 is never registered.
        let seq = reg.push(TypeDef::Sequence(99));
        let (value, consumed) = decode(&[0x00, 0xff, 0xff], seq, &reg).unwrap();
        assert_eq!(value, Value::Sequence(vec![]));
        assert_eq!(consumed, 1);
    }

    #[test]
    fn compact_fields_match_reference() {
        let t = types();
        for v in [0u32, 63, 64, 70_000, u32::MAX] {
            let bytes = Compact(v).encode();
            assert_eq!(
                decode_all(&bytes, t.compact_u32, &t.reg).unwrap(),
                Value::Compact(u128::from(v))
            );
        }
    }

    #[test]
    fn compact_overflowing_target_width() {
        let t = types();
        let bytes = Compact(u64::from(u32::MAX) + 1).encode();
        assert!(matches!(
            decode_all(&bytes, t.compact_u32, &t.reg),
            Err(DecodeError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn compact_wrapper_struct() {
        let mut reg = TypeRegistry::new();
        let u32_ = reg.push(TypeDef::Primitive(Primitive::U32));
        let perbill = reg.push_named(
            &["sp_arithmetic", "Perbill"],
            TypeDef::Composite(vec![Field::unnamed(u32_)]),
        );
        let compact = reg.push(TypeDef::Compact(perbill));
        let value = decode_all(&Compact(500_000_000u32).encode(), compact, &reg).unwrap();
        assert_eq!(value, Value::Compact(500_000_000));
    }

    #[test]
    fn cyclic_compact_wrapper_is_rejected() {
        let mut reg = TypeRegistry::new();
        let looped = reg.push(TypeDef::Composite(vec![Field::unnamed(0)]));
        let compact = reg.push(TypeDef::Compact(looped));
        let err = decode_all(&[0x04], compact, &reg).unwrap_err();
        assert!(
            matches!(&err, DecodeError::InvalidEncoding { offset: 0, reason } if reason.contains("cyclic")),
            "{err:?}"
        );

        let mut reg = TypeRegistry::new();
        let looped = reg.push(TypeDef::Tuple(vec![0]));
        let compact = reg.push(TypeDef::Compact(looped));
        assert!(matches!(
            decode_all(&[0x04], compact, &reg),
            Err(DecodeError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn truncated_struct_reports_eof_offset() {
        let t = types();
        let bytes = 7u32.encode();
        let err = decode(&bytes, t.account_info, &t.reg).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedEof {
                offset: 4,
                needed: 4,
                available: 0
            }
        );
    }

    #[test]
    fn unknown_type_id() {
        let t = types();
        assert_eq!(
            decode(&[0], 1_000, &t.reg).unwrap_err(),
            DecodeError::TypeNotFound { id: 1_000 }
        );
    }

    #[test]
    fn primitives_roundtrip() {
        let t = types();
        let mut reg = t.reg.clone();
        let cases: Vec<(Primitive, Value)> = vec![
            (Primitive::Bool, Value::Bool(true)),
            (Primitive::Char, Value::Char('λ')),
            (Primitive::Str, Value::Str("hello".into())),
            (Primitive::U16, Value::U16(0xbeef)),
            (Primitive::U64, Value::U64(u64::MAX)),
            (Primitive::U256, Value::U256([7; 32])),
            (Primitive::I8, Value::I8(-3)),
            (Primitive::I32, Value::I32(-70_000)),
            (Primitive::I128, Value::I128(i128::MIN)),
        ];
        for (p, v) in cases {
            let id = reg.push(TypeDef::Primitive(p));
            let bytes = encode(&v);
            assert_eq!(decode_all(&bytes, id, &reg).unwrap(), v, "{p:?}");
        }
        assert_eq!(decode_all(&[5], t.u8_, &t.reg).unwrap(), Value::U8(5));
        assert_eq!(
            decode_all(&1u128.encode(), t.u128_, &t.reg).unwrap(),
            Value::U128(1)
        );
        assert_eq!(
            decode_all(&9u32.encode(), t.u32_, &t.reg).unwrap(),
            Value::U32(9)
        );
    }

    #[test]
    fn invalid_utf8_and_char() {
        let mut reg = TypeRegistry::new();
        let s = reg.push(TypeDef::Primitive(Primitive::Str));
        let c = reg.push(TypeDef::Primitive(Primitive::Char));
        assert!(matches!(
            decode_all(&[0x04, 0xff], s, &reg),
            Err(DecodeError::InvalidEncoding { offset: 1, .. })
        ));
        assert!(matches!(
            decode_all(&0xd800u32.to_le_bytes(), c, &reg),
            Err(DecodeError::InvalidEncoding { .. })
        ));
    }

    #[test]
    fn bit_sequence_u8_store() {
        let mut reg = TypeRegistry::new();
        let u8_ = reg.push(TypeDef::Primitive(Primitive::U8));
        let order = reg.push_named(&["bitvec", "order", "Lsb0"], TypeDef::Composite(vec![]));
        let bits = reg.push(TypeDef::BitSequence { store: u8_, order });
        // 10 bits → 2 bytes of storage.
        let bytes = [0x28, 0b1010_1010, 0b0000_0011];
        let value = decode_all(&bytes, bits, &reg).unwrap();
        assert_eq!(
            value,
            Value::BitSequence {
                bits: 10,
                data: vec![0b1010_1010, 0b0000_0011]
            }
        );
        assert_eq!(encode(&value), bytes);
    }

    #[test]
    fn self_referential_composite_is_bounded() {
        let reg = TypeRegistry::from_types([TypeInfo::new(
            0,
            TypeDef::Composite(vec![Field::unnamed(0)]),
        )]);
        assert!(matches!(
            decode(&[], 0, &reg),
            Err(DecodeError::InvalidEncoding { .. })
        ));
    }
}
