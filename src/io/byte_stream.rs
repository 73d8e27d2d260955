//! Seekable byte stream with switchable endianness.
//!
//! Every multi-byte value in a TIFF structure is encoded in the byte order
//! declared by the owning segment's header, so the stream carries a mutable
//! [`ByteOrder`] register. Code that temporarily switches the order (a
//! segment parser entering a big-endian APP1, for example) must save the
//! current order and restore it afterwards, in strict LIFO fashion, so that
//! callers always observe the configuration they set up.
//!
//! The stream is generic over any `Read`/`Write`/`Seek` backend. Two are used
//! in practice: [`std::fs::File`] for whole-file work and `Cursor<Vec<u8>>`
//! for bounded in-memory parsing (raw segment conversion, serialization
//! buffers, tests).

use std::fs::File;
use std::io::{Cursor, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::StreamError;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF structure.
///
/// Declared by the first two bytes of the TIFF header. All multi-byte values
/// under that header must be read and written respecting this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from a byte slice using this byte order.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 2 bytes.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes([bytes[0], bytes[1]]),
            ByteOrder::BigEndian => u16::from_be_bytes([bytes[0], bytes[1]]),
        }
    }

    /// Read a u32 from a byte slice using this byte order.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 4 bytes.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => {
                u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
            }
            ByteOrder::BigEndian => u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }

    /// Read a u64 from a byte slice using this byte order.
    ///
    /// # Panics
    /// Panics if the slice has fewer than 8 bytes.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(buf),
            ByteOrder::BigEndian => u64::from_be_bytes(buf),
        }
    }

    /// Encode a u16 in this byte order.
    #[inline]
    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    /// Encode a u32 in this byte order.
    #[inline]
    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }

    /// Encode a u64 in this byte order.
    #[inline]
    pub fn u64_bytes(self, value: u64) -> [u8; 8] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }
}

// =============================================================================
// ByteStream
// =============================================================================

/// A seekable stream of bytes with a byte-order register.
///
/// Wraps any backend implementing the `std::io` traits and layers endian-aware
/// integer codecs on top. All positions are absolute stream offsets; offsets
/// relative to a TIFF-header origin are resolved by the callers that know that
/// origin.
#[derive(Debug)]
pub struct ByteStream<S> {
    inner: S,
    byte_order: ByteOrder,
}

/// A stream over an in-memory buffer.
pub type MemoryStream = ByteStream<Cursor<Vec<u8>>>;

/// A stream over an open file.
pub type FileStream = ByteStream<File>;

impl<S> ByteStream<S> {
    /// Wrap an existing backend. The byte order starts little-endian and is
    /// reset by whoever parses a TIFF header.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            byte_order: ByteOrder::LittleEndian,
        }
    }

    /// Current byte order register.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Replace the byte order register, returning the previous value so the
    /// caller can restore it when its nested work is done.
    #[inline]
    pub fn set_byte_order(&mut self, order: ByteOrder) -> ByteOrder {
        std::mem::replace(&mut self.byte_order, order)
    }
}

impl MemoryStream {
    /// A stream over an owned byte buffer, positioned at the start.
    pub fn memory(data: Vec<u8>) -> Self {
        Self::new(Cursor::new(data))
    }

    /// An empty, growable stream for building output in memory.
    pub fn empty() -> Self {
        Self::new(Cursor::new(Vec::new()))
    }

    /// Consume the stream and return the underlying buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.inner.into_inner()
    }

    /// Borrow the underlying buffer without consuming the stream.
    pub fn as_slice(&self) -> &[u8] {
        self.inner.get_ref()
    }
}

impl FileStream {
    /// Open a file for reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        Ok(Self::new(File::open(path)?))
    }

    /// Create (or truncate) a file for writing.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StreamError> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<S: Seek> ByteStream<S> {
    /// Current absolute position.
    pub fn position(&mut self) -> Result<u64, StreamError> {
        Ok(self.inner.stream_position()?)
    }

    /// Seek to an absolute position. Seeking past the end is allowed; the gap
    /// is filled with zeros on the next write (file and cursor backends both
    /// behave this way).
    pub fn seek_to(&mut self, offset: u64) -> Result<u64, StreamError> {
        Ok(self.inner.seek(SeekFrom::Start(offset))?)
    }

    /// Seek relative to the current position.
    pub fn skip(&mut self, delta: i64) -> Result<u64, StreamError> {
        self.inner
            .seek(SeekFrom::Current(delta))
            .map_err(|_| StreamError::SeekOutOfBounds(delta))
    }

    /// Total stream length. Restores the current position afterwards.
    pub fn len(&mut self) -> Result<u64, StreamError> {
        let pos = self.inner.stream_position()?;
        let end = self.inner.seek(SeekFrom::End(0))?;
        if pos != end {
            self.inner.seek(SeekFrom::Start(pos))?;
        }
        Ok(end)
    }

    /// Seek to the end of the stream, returning the end position.
    pub fn seek_end(&mut self) -> Result<u64, StreamError> {
        Ok(self.inner.seek(SeekFrom::End(0))?)
    }
}

impl<S: Read> ByteStream<S> {
    /// Fill `buf` completely or fail.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), StreamError> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => StreamError::UnexpectedEof { wanted: buf.len() },
            _ => StreamError::Io(e.to_string()),
        })
    }

    /// Read exactly `n` bytes into a fresh buffer.
    pub fn read_vec(&mut self, n: usize) -> Result<Vec<u8>, StreamError> {
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, StreamError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a u16 in the stream's byte order.
    pub fn read_u16(&mut self) -> Result<u16, StreamError> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(self.byte_order.read_u16(&buf))
    }

    /// Read a u32 in the stream's byte order.
    pub fn read_u32(&mut self) -> Result<u32, StreamError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(self.byte_order.read_u32(&buf))
    }

    /// Read a u64 in the stream's byte order.
    pub fn read_u64(&mut self) -> Result<u64, StreamError> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(self.byte_order.read_u64(&buf))
    }
}

impl<S: Write> ByteStream<S> {
    /// Write all of `buf` or fail.
    pub fn write_all(&mut self, buf: &[u8]) -> Result<(), StreamError> {
        Ok(self.inner.write_all(buf)?)
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) -> Result<(), StreamError> {
        self.write_all(&[value])
    }

    /// Write a u16 in the stream's byte order.
    pub fn write_u16(&mut self, value: u16) -> Result<(), StreamError> {
        let bytes = self.byte_order.u16_bytes(value);
        self.write_all(&bytes)
    }

    /// Write a u32 in the stream's byte order.
    pub fn write_u32(&mut self, value: u32) -> Result<(), StreamError> {
        let bytes = self.byte_order.u32_bytes(value);
        self.write_all(&bytes)
    }

    /// Write a u64 in the stream's byte order.
    pub fn write_u64(&mut self, value: u64) -> Result<(), StreamError> {
        let bytes = self.byte_order.u64_bytes(value);
        self.write_all(&bytes)
    }
}

impl<S: Write + Seek> ByteStream<S> {
    /// Seek to `offset`, write a u16 there, and return to the prior position.
    ///
    /// Patch primitive for the two-pass writer: slots are reserved with
    /// placeholder bytes and overwritten here once the real value is known.
    pub fn patch_u16(&mut self, offset: u64, value: u16) -> Result<(), StreamError> {
        let pos = self.position()?;
        self.seek_to(offset)?;
        self.write_u16(value)?;
        self.seek_to(pos)?;
        Ok(())
    }

    /// Seek to `offset`, write a u32 there, and return to the prior position.
    pub fn patch_u32(&mut self, offset: u64, value: u32) -> Result<(), StreamError> {
        let pos = self.position()?;
        self.seek_to(offset)?;
        self.write_u32(value)?;
        self.seek_to(pos)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_order_read_u16() {
        let bytes = [0x12, 0x34];
        assert_eq!(ByteOrder::LittleEndian.read_u16(&bytes), 0x3412);
        assert_eq!(ByteOrder::BigEndian.read_u16(&bytes), 0x1234);
    }

    #[test]
    fn test_byte_order_read_u32() {
        let bytes = [0x12, 0x34, 0x56, 0x78];
        assert_eq!(ByteOrder::LittleEndian.read_u32(&bytes), 0x78563412);
        assert_eq!(ByteOrder::BigEndian.read_u32(&bytes), 0x12345678);
    }

    #[test]
    fn test_byte_order_round_trip() {
        for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            assert_eq!(order.read_u16(&order.u16_bytes(0xBEEF)), 0xBEEF);
            assert_eq!(order.read_u32(&order.u32_bytes(0xDEADBEEF)), 0xDEADBEEF);
            assert_eq!(
                order.read_u64(&order.u64_bytes(0x0123456789ABCDEF)),
                0x0123456789ABCDEF
            );
        }
    }

    #[test]
    fn test_memory_stream_read_write() {
        let mut stream = MemoryStream::empty();
        stream.write_u16(0x002A).unwrap();
        stream.write_u32(8).unwrap();
        stream.seek_to(0).unwrap();

        assert_eq!(stream.read_u16().unwrap(), 0x002A);
        assert_eq!(stream.read_u32().unwrap(), 8);
    }

    #[test]
    fn test_byte_order_register_swap() {
        let mut stream = MemoryStream::empty();
        stream.write_u16(0x1234).unwrap();

        let saved = stream.set_byte_order(ByteOrder::BigEndian);
        assert_eq!(saved, ByteOrder::LittleEndian);
        stream.write_u16(0x1234).unwrap();
        stream.set_byte_order(saved);

        assert_eq!(stream.as_slice(), &[0x34, 0x12, 0x12, 0x34]);
    }

    #[test]
    fn test_read_past_end() {
        let mut stream = MemoryStream::memory(vec![0x01, 0x02]);
        assert!(matches!(
            stream.read_u32(),
            Err(StreamError::UnexpectedEof { wanted: 4 })
        ));
    }

    #[test]
    fn test_len_restores_position() {
        let mut stream = MemoryStream::memory(vec![0u8; 10]);
        stream.seek_to(4).unwrap();
        assert_eq!(stream.len().unwrap(), 10);
        assert_eq!(stream.position().unwrap(), 4);
    }

    #[test]
    fn test_patch_preserves_position() {
        let mut stream = MemoryStream::empty();
        stream.write_u32(0).unwrap();
        stream.write_u16(0xAAAA).unwrap();

        stream.patch_u32(0, 0x11223344).unwrap();

        assert_eq!(stream.position().unwrap(), 6);
        assert_eq!(stream.as_slice(), &[0x44, 0x33, 0x22, 0x11, 0xAA, 0xAA]);
    }
}
