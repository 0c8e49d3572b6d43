//! Forward-only reader over a received DNS message.
//!
//! [`ByteReader`] replaces `std::io::Cursor` for decoding: every read is
//! bounds-checked against the bytes actually received and fails with
//! [`DnsError::OutOfBounds`] instead of panicking or reading stale buffer
//! contents. The full buffer stays reachable through [`ByteReader::buffer`]
//! so compression pointers can be resolved without moving the read position.

use crate::error::DnsError;

/// A read position over a borrowed message buffer.
///
/// # Examples
///
/// ```rust
/// use iterative_resolver::cursor::ByteReader;
///
/// let data = [0x12, 0x34, 0x00, 0x00, 0x0e, 0x10];
/// let mut reader = ByteReader::new(&data);
///
/// assert_eq!(reader.read_u16().unwrap(), 0x1234);
/// assert_eq!(reader.read_u32().unwrap(), 3600);
/// assert!(reader.read_u16().is_err());
/// ```
#[derive(Debug)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// The whole message, independent of the read position.
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Unread bytes from the current position to the end. Does not advance.
    pub fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    /// Returns the next `n` bytes and advances past them.
    ///
    /// # Errors
    ///
    /// Fails with [`DnsError::OutOfBounds`] if fewer than `n` bytes are left.
    /// The position is unchanged on failure.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DnsError> {
        let available = self.buf.len() - self.pos;
        if n > available {
            return Err(DnsError::OutOfBounds {
                offset: self.pos,
                needed: n,
                available,
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DnsError> {
        self.read_bytes(n).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Result<u8, DnsError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Reads a big-endian `u16`.
    pub fn read_u16(&mut self) -> Result<u16, DnsError> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, DnsError> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}
