//! TIFF header parsing and serialization.
//!
//! Every TIFF-based application segment embeds a classic 8-byte TIFF header,
//! and every offset inside the segment is relative to the first byte of this
//! header:
//!
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (always 42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```

use std::io::{Read, Write};

use crate::error::TiffError;
use crate::io::{ByteOrder, ByteStream};

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// The only valid version number for an EXIF TIFF header
pub const TIFF_VERSION: u16 = 42;

/// Size of the TIFF header in bytes
pub const TIFF_HEADER_SIZE: u64 = 8;

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF header.
///
/// Carries the byte order governing every multi-byte value under it and the
/// offset (relative to the header itself) of the first top-level IFD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all values in the owning segment
    pub byte_order: ByteOrder,

    /// Offset of the first IFD, relative to the start of this header
    pub first_ifd_offset: u32,
}

impl TiffHeader {
    /// Read a TIFF header from the stream's current position.
    ///
    /// On success the stream's byte-order register has been switched to the
    /// header's declared order (the version and offset fields are already
    /// read under it). Callers that need the previous order back are expected
    /// to have saved it beforehand.
    ///
    /// # Errors
    ///
    /// - `InvalidMagic` if the first two bytes are neither II nor MM
    /// - `InvalidVersion` if the version word is not 42
    /// - `Stream` if the header is truncated
    pub fn read<S: Read>(stream: &mut ByteStream<S>) -> Result<Self, TiffError> {
        let mut magic = [0u8; 2];
        stream.read_exact(&mut magic)?;

        // Both magics are doubled bytes, so the decode order does not matter;
        // little-endian is used for reporting unrecognized values.
        let magic = u16::from_le_bytes(magic);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };
        stream.set_byte_order(byte_order);

        let version = stream.read_u16()?;
        if version != TIFF_VERSION {
            return Err(TiffError::InvalidVersion(version));
        }

        let first_ifd_offset = stream.read_u32()?;
        Ok(TiffHeader {
            byte_order,
            first_ifd_offset,
        })
    }

    /// Write the header at the stream's current position and switch the
    /// stream's byte-order register to the header's order.
    pub fn write<S: Write>(&self, stream: &mut ByteStream<S>) -> Result<(), TiffError> {
        stream.set_byte_order(self.byte_order);
        let magic = match self.byte_order {
            ByteOrder::LittleEndian => BYTE_ORDER_LITTLE_ENDIAN,
            ByteOrder::BigEndian => BYTE_ORDER_BIG_ENDIAN,
        };
        stream.write_u16(magic)?;
        stream.write_u16(TIFF_VERSION)?;
        stream.write_u32(self.first_ifd_offset)?;
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
