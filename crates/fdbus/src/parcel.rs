// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 fdbus-rs contributors

//! Bounds-checked serialization primitives for name-service parcelables.
//!
//! The wire contract other bus implementations depend on:
//! - all integers little-endian
//! - strings are `u16` byte length + UTF-8 bytes, no terminator
//! - arrays are `u16` element count + elements back-to-back
//! - `bool` is a single byte, strictly `0` or `1`
//!
//! The codec performs no I/O and allocates only the result buffer.

use thiserror::Error;

/// Failure modes of [`Deserializer`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended before the field was complete.
    #[error("truncated input")]
    Truncated,

    /// A length or value field holds something the layout forbids.
    #[error("invalid length or value")]
    BadLength,

    /// The options byte has bits set that this message does not define.
    #[error("unknown option bit")]
    UnknownOption,

    /// A string field is not valid UTF-8.
    #[error("invalid utf-8 in string field")]
    Utf8,
}

/// A value type with a defined binary encoding.
///
/// Fields serialize in declaration order; optional sub-records are guarded
/// by an options bitmask byte owned by the enclosing message.
pub trait Parcelable: Sized {
    fn serialize(&self, s: &mut Serializer);
    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError>;

    /// Encode into a fresh buffer.
    fn encode(&self) -> Vec<u8> {
        let mut s = Serializer::new();
        self.serialize(&mut s);
        s.finish()
    }

    /// Decode from a complete buffer.
    fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        Self::deserialize(&mut Deserializer::new(buf))
    }
}

// ============================================================================
// Serializer
// ============================================================================

/// Append-only write cursor.
pub struct Serializer {
    buf: Vec<u8>,
}

impl Serializer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    /// Strings longer than `u16::MAX` bytes are not representable; the tail
    /// is truncated at a character boundary rather than corrupting the frame.
    pub fn put_str(&mut self, v: &str) {
        let mut bytes = v.as_bytes();
        if bytes.len() > u16::MAX as usize {
            let mut end = u16::MAX as usize;
            while !v.is_char_boundary(end) {
                end -= 1;
            }
            bytes = &v.as_bytes()[..end];
        }
        self.put_u16(bytes.len() as u16);
        self.buf.extend_from_slice(bytes);
    }

    pub fn put_array<T: Parcelable>(&mut self, items: &[T]) {
        debug_assert!(items.len() <= u16::MAX as usize);
        self.put_u16(items.len() as u16);
        for item in items {
            item.serialize(self);
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Deserializer
// ============================================================================

/// Read cursor over a received buffer.
pub struct Deserializer<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Deserializer<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated);
        }
        let out = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(out)
    }

    pub fn get_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn get_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn get_bool(&mut self) -> Result<bool, DecodeError> {
        match self.get_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DecodeError::BadLength),
        }
    }

    pub fn get_str(&mut self) -> Result<String, DecodeError> {
        let len = self.get_u16()? as usize;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::Utf8)
    }

    pub fn get_array<T: Parcelable>(&mut self) -> Result<Vec<T>, DecodeError> {
        let count = self.get_u16()? as usize;
        let mut out = Vec::with_capacity(count.min(self.remaining()));
        for _ in 0..count {
            out.push(T::deserialize(self)?);
        }
        Ok(out)
    }
}

impl Parcelable for String {
    fn serialize(&self, s: &mut Serializer) {
        s.put_str(self);
    }

    fn deserialize(d: &mut Deserializer<'_>) -> Result<Self, DecodeError> {
        d.get_str()
    }
}

// ============================================================================
// Tests
// ============================================================================
