//! Byte-level helpers shared by the codec.
//!
//! Writing goes through [`Bytes`], a growable buffer. Reading never keeps a
//! cursor: every reader takes the whole buffer and an offset and returns the
//! value together with the offset of the next unread byte, or `None` if the
//! read would run past the end.

/// A byte buffer that messages are written to.
#[derive(Debug, Default)]
pub struct Bytes {
    buf: Vec<u8>,
}

impl Bytes {
    /// Creates a new empty buffer.
    pub fn new() -> Self {
        Self { buf: vec![] }
    }

    /// Returns the bytes written so far.
    pub fn used(&self) -> &[u8] {
        &self.buf
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the buffer, returning the written bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    /// Writes a byte to the buffer.
    pub(crate) fn write(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    /// Writes multiple bytes to the buffer.
    pub(crate) fn write_all(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a big-endian u16 to the buffer.
    pub(crate) fn write_u16(&mut self, num: u16) {
        self.write_all(&num.to_be_bytes());
    }

    /// Writes a big-endian u32 to the buffer.
    pub(crate) fn write_u32(&mut self, num: u32) {
        self.write_all(&num.to_be_bytes());
    }
}

/// Reads the byte at `offset`.
pub(crate) fn read_u8(buf: &[u8], offset: usize) -> Option<(u8, usize)> {
    let byte = *buf.get(offset)?;
    Some((byte, offset + 1))
}

/// Reads `n` bytes starting at `offset`.
pub(crate) fn read_exact(buf: &[u8], offset: usize, n: usize) -> Option<(&[u8], usize)> {
    let end = offset.checked_add(n)?;
    let bytes = buf.get(offset..end)?;
    Some((bytes, end))
}

/// Reads a big-endian u16 starting at `offset`.
pub(crate) fn read_u16(buf: &[u8], offset: usize) -> Option<(u16, usize)> {
    let (bytes, next) = read_exact(buf, offset, 2)?;
    Some((u16::from_be_bytes([bytes[0], bytes[1]]), next))
}

/// Reads a big-endian u32 starting at `offset`.
pub(crate) fn read_u32(buf: &[u8], offset: usize) -> Option<(u32, usize)> {
    let (bytes, next) = read_exact(buf, offset, 4)?;
    Some((
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        next,
    ))
}
