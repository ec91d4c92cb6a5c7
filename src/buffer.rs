//! Bounds-checked sequential reader over a byte slice.
//!
//! The write half of the engine appends into a growable [`bytes::BytesMut`]
//! owned by the writer for the duration of one serialize call; this module
//! supplies the matching read cursor. Each call owns exactly one cursor,
//! never shared.

use crate::{Result, WireError};

/// A read cursor over borrowed input bytes.
///
/// All reads advance the cursor by exactly the consumed length and fail with
/// [`WireError::InsufficientData`] when the input is truncated.
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self.buf.get(self.pos).ok_or(WireError::InsufficientData)?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(WireError::InsufficientData)?;
        if end > self.buf.len() {
            return Err(WireError::InsufficientData);
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// The unconsumed tail of the input.
    ///
    /// Used when delegating to a nested decode that operates on "the rest of
    /// the input" and reports how much of it it consumed; the caller then
    /// [`advance`](Self::advance)s by that amount.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub fn advance(&mut self, n: usize) -> Result<()> {
        if n > self.buf.len() - self.pos {
            return Err(WireError::InsufficientData);
        }
        self.pos += n;
        Ok(())
    }

    /// Total bytes consumed since construction.
    pub fn consumed(&self) -> usize {
        self.pos
    }
}
