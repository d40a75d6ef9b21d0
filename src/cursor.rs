//! Sequential, position-tracking byte access shared by all directives.
//!
//! The engine expresses every byte it consumes or produces through the
//! [ByteCursor] contract, so any byte-addressable source (memory buffer,
//! file image, network payload) can back a decode.

use crate::errors::{ReadError, WriteError};

/// Position-tracking reader/writer over a byte source.
///
/// One cursor belongs to exactly one in-progress decode; cursor position
/// is mutable shared state and must not be shared across concurrent
/// decodes without external synchronization.
pub trait ByteCursor {
    /// Reads exactly `n` bytes, advancing the position.
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, ReadError>;

    /// Reads up to and including `delimiter`, returning the bytes before
    /// it. The delimiter is consumed but excluded from the result.
    fn read_until(&mut self, delimiter: u8) -> Result<Vec<u8>, ReadError>;

    /// Writes `data` at the current position, advancing past it.
    fn write(&mut self, data: &[u8]) -> Result<(), WriteError>;

    /// Repositions to an absolute byte offset.
    fn seek(&mut self, offset: usize);

    /// Current absolute byte offset.
    fn position(&self) -> usize;
}

/// In-memory [ByteCursor] over an owned buffer.
#[derive(Debug, Clone, Default)]
pub struct MemCursor {
    buf: Vec<u8>,
    pos: usize,
}

impl MemCursor {
    /// Empty cursor, ready for writing.
    pub fn new() -> Self {
        MemCursor::default()
    }

    /// Cursor over existing bytes, positioned at offset 0.
    pub fn from_bytes(buf: impl Into<Vec<u8>>) -> Self {
        MemCursor {
            buf: buf.into(),
            pos: 0,
        }
    }

    /// Consumes the cursor and returns the underlying buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Bytes remaining between the position and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }
}

impl ByteCursor for MemCursor {
    fn read_exact(&mut self, n: usize) -> Result<Vec<u8>, ReadError> {
        if self.remaining() < n {
            return Err(ReadError::TruncatedStream {
                needed: n,
                available: self.remaining(),
            });
        }

        let out = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(out)
    }

    fn read_until(&mut self, delimiter: u8) -> Result<Vec<u8>, ReadError> {
        let rest = &self.buf[self.pos.min(self.buf.len())..];

        match rest.iter().position(|b| *b == delimiter) {
            Some(idx) => {
                let out = rest[..idx].to_vec();
                self.pos += idx + 1;
                Ok(out)
            }
            None => Err(ReadError::DelimiterNotFound),
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<(), WriteError> {
        // An absolute seek may have positioned us past the buffer end.
        if self.pos > self.buf.len() {
            self.buf.resize(self.pos, 0);
        }

        let overlap = (self.buf.len() - self.pos).min(data.len());
        self.buf[self.pos..self.pos + overlap].copy_from_slice(&data[..overlap]);
        self.buf.extend_from_slice(&data[overlap..]);
        self.pos += data.len();
        Ok(())
    }

    fn seek(&mut self, offset: usize) {
        self.pos = offset;
    }

    fn position(&self) -> usize {
        self.pos
    }
}
