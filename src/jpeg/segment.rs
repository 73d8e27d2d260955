//! Application segments: raw byte blobs and their TIFF-based reinterpretation.
//!
//! On disk every APPn segment looks the same:
//!
//! ```text
//! Bytes 0-1:  Marker (FFE0-FFEF)
//! Bytes 2-3:  Length, big-endian, counts itself and everything after
//! Bytes 4-:   NUL-terminated identifier ("Exif", "JFIF", ...)
//!             then the vendor payload
//! ```
//!
//! Parsing keeps each segment raw (the copied bytes include the length
//! field). A raw segment whose (marker, identifier) names a recognized
//! TIFF-based kind can later be reinterpreted in place; unrecognized
//! segments round-trip verbatim.

use std::io::{Read, Seek, Write};

use bytes::Bytes;

use crate::error::FileError;
use crate::io::ByteStream;

use super::tiff_segment::TiffSegment;
use super::{APP1, APP3};

/// Identifier assigned when a segment has no NUL terminator within the cap.
pub const INVALID_IDENT: &str = "INVALID";

/// Longest identifier considered when scanning for the NUL terminator.
const IDENT_CAP: usize = 127;

// =============================================================================
// Dispatch
// =============================================================================

/// Whether a (marker, identifier) pair names a TIFF-based segment kind.
///
/// APP1 carries "Exif"; APP3 appears in the wild with four identifier
/// spellings. Everything else stays raw.
pub fn is_tiff_kind(marker: u16, ident: &str) -> bool {
    match marker {
        APP1 => ident == "Exif",
        APP3 => matches!(ident, "EXIF" | "Exif" | "META" | "Meta"),
        _ => false,
    }
}

// =============================================================================
// RawSegment
// =============================================================================

/// An application segment held as the verbatim bytes read from the file.
///
/// `data` starts at the 2-byte length field, so writing a raw segment back
/// is marker + data with nothing recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    marker: u16,
    ident: String,
    data: Bytes,
    conversion_attempted: bool,
}

impl RawSegment {
    /// Wrap already-assembled segment bytes. `data` must start at the
    /// length field, as [`read`](Self::read) produces.
    pub fn new(marker: u16, data: Bytes) -> Self {
        let ident = parse_ident(&data);
        RawSegment {
            marker,
            ident,
            data,
            conversion_attempted: false,
        }
    }

    /// Read one segment body; the stream is positioned just past the
    /// marker and must be in big-endian mode (JPEG field order).
    pub fn read<S: Read>(stream: &mut ByteStream<S>, marker: u16) -> Result<Self, FileError> {
        let len = stream.read_u16()?;
        if len < 2 {
            return Err(FileError::BadSegmentLength { marker, len });
        }

        let mut data = Vec::with_capacity(len as usize);
        data.extend_from_slice(&len.to_be_bytes());
        data.extend_from_slice(&stream.read_vec(len as usize - 2)?);

        Ok(Self::new(marker, Bytes::from(data)))
    }

    /// Write the segment verbatim; the stream must be in big-endian mode.
    pub fn write<S: Write>(&self, stream: &mut ByteStream<S>) -> Result<(), FileError> {
        stream.write_u16(self.marker)?;
        stream.write_all(&self.data)?;
        Ok(())
    }

    pub fn marker(&self) -> u16 {
        self.marker
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// The segment body, starting at the length field.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Whether a TIFF reinterpretation was already tried (and failed, or
    /// this segment would no longer be raw).
    pub fn conversion_attempted(&self) -> bool {
        self.conversion_attempted
    }

    pub(crate) fn mark_conversion_attempted(&mut self) {
        self.conversion_attempted = true;
    }

    /// The bytes after the identifier's NUL terminator and any padding
    /// NULs: where a TIFF header would start. `None` when no terminator
    /// exists.
    pub fn tiff_payload(&self) -> Option<Bytes> {
        let body = self.data.get(2..)?;
        let nul = body.iter().position(|&b| b == 0)?;
        let mut start = nul + 1;
        while body.get(start) == Some(&0) {
            start += 1;
        }
        Some(self.data.slice(2 + start..))
    }
}

/// Identifier = the bytes between the length field and the first NUL,
/// scanned over at most [`IDENT_CAP`] bytes.
fn parse_ident(data: &[u8]) -> String {
    let body = match data.get(2..) {
        Some(b) => b,
        None => return INVALID_IDENT.to_string(),
    };
    let scan = &body[..body.len().min(IDENT_CAP)];
    match scan.iter().position(|&b| b == 0) {
        Some(nul) => String::from_utf8_lossy(&scan[..nul]).into_owned(),
        None => INVALID_IDENT.to_string(),
    }
}

// =============================================================================
// AppSegment
// =============================================================================

/// One application segment, raw or reinterpreted as TIFF directories.
#[derive(Debug, Clone, PartialEq)]
pub enum AppSegment {
    Raw(RawSegment),
    Tiff(TiffSegment),
}

impl AppSegment {
    pub fn marker(&self) -> u16 {
        match self {
            AppSegment::Raw(raw) => raw.marker(),
            AppSegment::Tiff(tiff) => tiff.marker(),
        }
    }

    pub fn ident(&self) -> &str {
        match self {
            AppSegment::Raw(raw) => raw.ident(),
            AppSegment::Tiff(tiff) => tiff.ident(),
        }
    }

    /// Serialize the segment; the stream must be in big-endian mode.
    pub fn write<S: Write + Seek>(&mut self, stream: &mut ByteStream<S>) -> Result<(), FileError> {
        match self {
            AppSegment::Raw(raw) => raw.write(stream),
            AppSegment::Tiff(tiff) => tiff.serialize(stream),
        }
    }

    pub fn as_raw(&self) -> Option<&RawSegment> {
        match self {
            AppSegment::Raw(raw) => Some(raw),
            AppSegment::Tiff(_) => None,
        }
    }

    pub fn as_tiff(&self) -> Option<&TiffSegment> {
        match self {
            AppSegment::Tiff(tiff) => Some(tiff),
            AppSegment::Raw(_) => None,
        }
    }

    pub fn as_tiff_mut(&mut self) -> Option<&mut TiffSegment> {
        match self {
            AppSegment::Tiff(tiff) => Some(tiff),
            AppSegment::Raw(_) => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{ByteOrder, MemoryStream};

    fn segment_bytes(ident: &[u8], payload: &[u8]) -> Vec<u8> {
        let len = (2 + ident.len() + payload.len()) as u16;
        let mut bytes = len.to_be_bytes().to_vec();
        bytes.extend_from_slice(ident);
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_dispatch_table() {
        assert!(is_tiff_kind(APP1, "Exif"));
        assert!(is_tiff_kind(APP3, "EXIF"));
        assert!(is_tiff_kind(APP3, "Exif"));
        assert!(is_tiff_kind(APP3, "META"));
        assert!(is_tiff_kind(APP3, "Meta"));

        assert!(!is_tiff_kind(APP1, "EXIF"));
        assert!(!is_tiff_kind(APP1, "http://ns.adobe.com/xap/1.0/"));
        assert!(!is_tiff_kind(super::super::APP0, "JFIF"));
        assert!(!is_tiff_kind(APP3, "meta"));
    }

    #[test]
    fn test_read_keeps_length_field_bytes() {
        let bytes = segment_bytes(b"JFIF\0", &[0x01, 0x02]);
        let mut stream = MemoryStream::memory(bytes.clone());
        stream.set_byte_order(ByteOrder::BigEndian);

        let raw = RawSegment::read(&mut stream, super::super::APP0).unwrap();
        assert_eq!(raw.ident(), "JFIF");
        assert_eq!(raw.data().as_ref(), bytes.as_slice());
    }

    #[test]
    fn test_read_rejects_undersized_length() {
        let mut stream = MemoryStream::memory(vec![0x00, 0x01]);
        stream.set_byte_order(ByteOrder::BigEndian);

        let result = RawSegment::read(&mut stream, APP1);
        assert!(matches!(
            result,
            Err(FileError::BadSegmentLength {
                marker: APP1,
                len: 1
            })
        ));
    }

    #[test]
    fn test_write_round_trip() {
        let bytes = segment_bytes(b"Exif\0\0", &[0xAA, 0xBB, 0xCC]);
        let raw = RawSegment::new(APP1, Bytes::from(bytes.clone()));

        let mut stream = MemoryStream::empty();
        stream.set_byte_order(ByteOrder::BigEndian);
        raw.write(&mut stream).unwrap();

        let mut expected = APP1.to_be_bytes().to_vec();
        expected.extend_from_slice(&bytes);
        assert_eq!(stream.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_unterminated_ident_is_invalid() {
        let mut data = vec![0x00, 0x84]; // length 132
        data.extend_from_slice(&[b'A'; 130]); // no NUL within the cap
        let raw = RawSegment::new(APP1, Bytes::from(data));
        assert_eq!(raw.ident(), INVALID_IDENT);
        assert!(raw.tiff_payload().is_none());
    }

    #[test]
    fn test_tiff_payload_skips_padding_nuls() {
        let mut data = vec![0x00, 0x0C];
        data.extend_from_slice(b"Exif\0\0"); // terminator plus one pad NUL
        data.extend_from_slice(&[0x49, 0x49, 0x2A, 0x00]);
        let raw = RawSegment::new(APP1, Bytes::from(data));

        let payload = raw.tiff_payload().unwrap();
        assert_eq!(payload.as_ref(), &[0x49, 0x49, 0x2A, 0x00]);
    }

    #[test]
    fn test_app_segment_accessors() {
        let raw = RawSegment::new(APP1, Bytes::from(segment_bytes(b"Exif\0\0", &[])));
        let segment = AppSegment::Raw(raw);

        assert_eq!(segment.marker(), APP1);
        assert_eq!(segment.ident(), "Exif");
        assert!(segment.as_raw().is_some());
        assert!(segment.as_tiff().is_none());
    }
}
