//! Bounds-checked, fixed-endianness byte helpers
//!
//! Every multi-byte field is written with an explicit byte order. Image
//! structure fields are big-endian, snapshot fields are little-endian; host
//! byte order never leaks into an encoded buffer.

use crate::error::{ScarletError, ScarletResult};

/// Sequential writer over a preallocated buffer.
///
/// Writing past the end is a size-plan violation, so it surfaces as
/// [`ScarletError::FormatInvariant`] instead of growing the buffer.
#[derive(Debug)]
pub struct ByteWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the buffer
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Reserve `len` bytes and return them for in-place filling
    pub fn reserve(&mut self, len: usize) -> ScarletResult<&mut [u8]> {
        if len > self.remaining() {
            return Err(ScarletError::FormatInvariant(format!(
                "write of {} bytes at offset {} overruns buffer of {} bytes",
                len,
                self.pos,
                self.buf.len()
            )));
        }
        let start = self.pos;
        self.pos += len;
        Ok(&mut self.buf[start..start + len])
    }

    /// Everything not yet written, without advancing
    pub fn tail(&mut self) -> &mut [u8] {
        &mut self.buf[self.pos..]
    }

    /// Advance over `len` bytes filled through [`ByteWriter::tail`]
    pub fn advance(&mut self, len: usize) -> ScarletResult<()> {
        self.reserve(len).map(|_| ())
    }

    /// Already-written bytes in `start..end`, for checksums and back-filling
    /// length fields
    pub fn written_mut(&mut self, start: usize, end: usize) -> &mut [u8] {
        let end = end.min(self.pos);
        &mut self.buf[start.min(end)..end]
    }

    pub fn put_slice(&mut self, bytes: &[u8]) -> ScarletResult<()> {
        self.reserve(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn put_u16_le(&mut self, value: u16) -> ScarletResult<()> {
        self.put_slice(&value.to_le_bytes())
    }

    pub fn put_u32_le(&mut self, value: u32) -> ScarletResult<()> {
        self.put_slice(&value.to_le_bytes())
    }

    pub fn put_u32_be(&mut self, value: u32) -> ScarletResult<()> {
        self.put_slice(&value.to_be_bytes())
    }
}

/// Sequential reader over an encoded buffer.
///
/// Running out of input is reported as [`ScarletError::SnapshotDecode`].
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, len: usize) -> ScarletResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(ScarletError::SnapshotDecode(format!(
                "needed {} bytes at offset {}, only {} left",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.buf[start..start + len])
    }

    fn array<const N: usize>(&mut self) -> ScarletResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn u16_le(&mut self) -> ScarletResult<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn u32_le(&mut self) -> ScarletResult<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }
}
