use bytes::{Buf, BufMut, BytesMut};

use super::{MAX_STRING_LEN, ProtocolError};

/// Cursor over a received datagram. Every read checks the remaining length
/// and fails with [`ProtocolError::Truncated`] instead of panicking.
#[derive(Debug)]
pub struct FrameReader<'a> {
    buf: &'a [u8],
}

impl<'a> FrameReader<'a> {
    /// Wraps `buf` without consuming anything.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn need(&self, n: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() < n {
            return Err(ProtocolError::Truncated);
        }
        Ok(())
    }

    /// Reads one unsigned byte.
    pub fn u8(&mut self) -> Result<u8, ProtocolError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    /// Reads one signed byte.
    pub fn i8(&mut self) -> Result<i8, ProtocolError> {
        self.need(1)?;
        Ok(self.buf.get_i8())
    }

    /// Reads one byte as a boolean; any nonzero value is true.
    pub fn bool(&mut self) -> Result<bool, ProtocolError> {
        Ok(self.i8()? != 0)
    }

    /// Reads a big-endian u32.
    pub fn u32(&mut self) -> Result<u32, ProtocolError> {
        self.need(4)?;
        Ok(self.buf.get_u32())
    }

    /// Reads a big-endian i32.
    pub fn i32(&mut self) -> Result<i32, ProtocolError> {
        self.need(4)?;
        Ok(self.buf.get_i32())
    }

    /// Reads a big-endian u64.
    pub fn u64(&mut self) -> Result<u64, ProtocolError> {
        self.need(8)?;
        Ok(self.buf.get_u64())
    }

    /// Reads a big-endian i64.
    pub fn i64(&mut self) -> Result<i64, ProtocolError> {
        self.need(8)?;
        Ok(self.buf.get_i64())
    }

    /// Reads a big-endian IEEE-754 double.
    pub fn f64(&mut self) -> Result<f64, ProtocolError> {
        self.need(8)?;
        Ok(self.buf.get_f64())
    }

    /// Reads a u32-length-prefixed UTF-8 string.
    ///
    /// A prefix of 0 or greater than [`MAX_STRING_LEN`] is a defined absence
    /// sentinel, not an error: the value is `None` and only the 4-byte prefix
    /// is consumed. Peers encode null strings as `0xFFFFFFFF`.
    pub fn string(&mut self) -> Result<Option<String>, ProtocolError> {
        let len = self.u32()?;
        if len == 0 || len > MAX_STRING_LEN {
            return Ok(None);
        }
        let len = len as usize;
        self.need(len)?;
        let value = String::from_utf8_lossy(&self.buf[..len]).into_owned();
        self.buf.advance(len);
        Ok(Some(value))
    }
}

/// Builder for outbound frames, mirroring [`FrameReader`]'s wire rules.
#[derive(Debug, Default)]
pub struct FrameWriter {
    buf: BytesMut,
}

impl FrameWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one unsigned byte.
    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.put_u8(v);
        self
    }

    /// Appends one signed byte.
    pub fn i8(&mut self, v: i8) -> &mut Self {
        self.buf.put_i8(v);
        self
    }

    /// Appends a boolean as one byte.
    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.buf.put_i8(i8::from(v));
        self
    }

    /// Appends a big-endian u32.
    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32(v);
        self
    }

    /// Appends a big-endian i32.
    pub fn i32(&mut self, v: i32) -> &mut Self {
        self.buf.put_i32(v);
        self
    }

    /// Appends a big-endian u64.
    pub fn u64(&mut self, v: u64) -> &mut Self {
        self.buf.put_u64(v);
        self
    }

    /// Appends a big-endian IEEE-754 double.
    pub fn f64(&mut self, v: f64) -> &mut Self {
        self.buf.put_f64(v);
        self
    }

    /// Appends a length-prefixed UTF-8 string; `None` encodes as the
    /// `0xFFFFFFFF` null sentinel.
    pub fn string(&mut self, v: Option<&str>) -> &mut Self {
        match v {
            Some(s) => {
                self.buf.put_u32(s.len() as u32);
                self.buf.put_slice(s.as_bytes());
            }
            None => {
                self.buf.put_u32(u32::MAX);
            }
        }
        self
    }

    /// Consumes the writer and returns the framed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}
