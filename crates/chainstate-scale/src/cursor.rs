//! Forward-only read cursor over a byte slice.
//!
//! Every read either consumes exactly the bytes it needs or fails without
//! moving; errors carry the offset at which the read was attempted.

use chainstate_core::error::DecodeError;

use crate::compact::decode_compact;

/// A read position within an input buffer.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread tail of the input.
    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    /// Build an `InvalidEncoding` error at `offset`.
    pub fn invalid(&self, offset: usize, reason: impl Into<String>) -> DecodeError {
        DecodeError::InvalidEncoding {
            offset,
            reason: reason.into(),
        }
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if n > self.remaining() {
            return Err(DecodeError::UnexpectedEof {
                offset: self.offset,
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        self.read_array().map(u64::from_le_bytes)
    }

    pub fn read_u128(&mut self) -> Result<u128, DecodeError> {
        self.read_array().map(u128::from_le_bytes)
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        let at = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(self.invalid(at, format!("invalid bool byte 0x{b:02x}"))),
        }
    }

    pub fn read_compact(&mut self) -> Result<u128, DecodeError> {
        decode_compact(self)
    }

    /// Read a `Compact<u32>` length prefix.
    pub fn read_len(&mut self) -> Result<usize, DecodeError> {
        let at = self.offset;
        let len = self.read_compact()?;
        u32::try_from(len)
            .map(|l| l as usize)
            .map_err(|_| self.invalid(at, format!("length {len} exceeds u32")))
    }

    /// Read a compact-length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<String, DecodeError> {
        let len = self.read_len()?;
        let at = self.offset;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| self.invalid(at, format!("invalid utf-8: {e}")))
    }

    /// Read a compact-length-prefixed sequence using `f` for each element.
    pub fn read_vec<T, E>(
        &mut self,
        mut f: impl FnMut(&mut Self) -> Result<T, E>,
    ) -> Result<Vec<T>, E>
    where
        E: From<DecodeError>,
    {
        let len = self.read_len()?;
        // Pre-allocation is bounded by the unread input.
        let mut items = Vec::with_capacity(len.min(self.remaining()));
        for _ in 0..len {
            items.push(f(self)?);
        }
        Ok(items)
    }

    /// Read an `Option<T>`: `0x00` for `None`, `0x01` followed by `T`.
    pub fn read_option<T, E>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, E>,
    ) -> Result<Option<T>, E>
    where
        E: From<DecodeError>,
    {
        let at = self.offset;
        match self.read_u8()? {
            0 => Ok(None),
            1 => f(self).map(Some),
            b => Err(self.invalid(at, format!("invalid option discriminant {b}")).into()),
        }
    }

    /// Fail if any input is left unread.
    pub fn finish(&self) -> Result<(), DecodeError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::TrailingBytes {
                consumed: self.offset,
                total: self.data.len(),
            })
        }
    }
}
