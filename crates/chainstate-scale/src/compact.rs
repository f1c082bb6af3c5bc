//! SCALE compact (variable-length) integers.
//!
//! | low bits | bytes | range            |
//! |----------|-------|------------------|
//! | `0b00`   | 1     | `0 ..= 2^6 - 1`  |
//! | `0b01`   | 2     | `2^6 ..= 2^14 - 1` |
//! | `0b10`   | 4     | `2^14 ..= 2^30 - 1` |
//! | `0b11`   | 1 + n | `n = (first >> 2) + 4` little-endian bytes |
//!
//! Decoding enforces the minimal class: a value that fits a smaller class
//! (or carries a zero most-significant byte in big-integer mode) is rejected.
//! Values wider than 128 bits are rejected as well.

use chainstate_core::error::DecodeError;

use crate::cursor::Cursor;

const SINGLE_MAX: u128 = (1 << 6) - 1;
const TWO_MAX: u128 = (1 << 14) - 1;
const FOUR_MAX: u128 = (1 << 30) - 1;

/// Decode a compact integer from `cursor`.
pub fn decode_compact(cursor: &mut Cursor<'_>) -> Result<u128, DecodeError> {
    let start = cursor.offset();
    let first = cursor.read_u8()?;
    match first & 0b11 {
        0b00 => Ok(u128::from(first >> 2)),
        0b01 => {
            let second = cursor.read_u8()?;
            let value = u128::from(u16::from_le_bytes([first, second]) >> 2);
            if value <= SINGLE_MAX {
                return Err(non_minimal(cursor, start, value, "two-byte"));
            }
            Ok(value)
        }
        0b10 => {
            let rest = cursor.read_array::<3>()?;
            let value = u128::from(u32::from_le_bytes([first, rest[0], rest[1], rest[2]]) >> 2);
            if value <= TWO_MAX {
                return Err(non_minimal(cursor, start, value, "four-byte"));
            }
            Ok(value)
        }
        _ => {
            let len = usize::from(first >> 2) + 4;
            if len > 16 {
                return Err(cursor.invalid(
                    start,
                    format!("compact integer of {len} bytes exceeds 128 bits"),
                ));
            }
            let bytes = cursor.read_bytes(len)?;
            let mut buf = [0u8; 16];
            buf[..len].copy_from_slice(bytes);
            let value = u128::from_le_bytes(buf);
            let minimal = if len == 4 {
                value > FOUR_MAX
            } else {
                bytes[len - 1] != 0
            };
            if !minimal {
                return Err(non_minimal(cursor, start, value, "big-integer"));
            }
            Ok(value)
        }
    }
}

fn non_minimal(cursor: &Cursor<'_>, at: usize, value: u128, class: &str) -> DecodeError {
    cursor.invalid(
        at,
        format!("non-minimal compact encoding: {value} in {class} form"),
    )
}

/// Append the minimal compact encoding of `value` to `out`.
pub fn encode_compact(value: u128, out: &mut Vec<u8>) {
    match value {
        0..=SINGLE_MAX => out.push((value as u8) << 2),
        0..=TWO_MAX => out.extend_from_slice(&(((value as u16) << 2) | 0b01).to_le_bytes()),
        0..=FOUR_MAX => out.extend_from_slice(&(((value as u32) << 2) | 0b10).to_le_bytes()),
        _ => {
            let len = compact_byte_len(value);
            out.push((((len - 4) as u8) << 2) | 0b11);
            out.extend_from_slice(&value.to_le_bytes()[..len]);
        }
    }
}

/// Number of little-endian bytes needed to hold `value` (at least 4).
fn compact_byte_len(value: u128) -> usize {
    let significant = 16 - (value.leading_zeros() / 8) as usize;
    significant.max(4)
}

/// Size in bytes of the compact encoding of `value`.
pub fn compact_len(value: u128) -> usize {
    match value {
        0..=SINGLE_MAX => 1,
        0..=TWO_MAX => 2,
        0..=FOUR_MAX => 4,
        _ => 1 + compact_byte_len(value),
    }
}
