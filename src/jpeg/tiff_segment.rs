//! TIFF-based application segments and IFD path navigation.
//!
//! A TIFF-based segment (APP1 "Exif" and friends) wraps a chain of
//! top-level directories behind a classic TIFF header:
//!
//! ```text
//! FFEn            marker
//! LLLL            length (big-endian, patched after the fact)
//! 45 78 69 66 00  "Exif" identifier, NUL-terminated, padded to even
//! 00
//! 49 49 2A 00     TIFF header <- all directory offsets are relative
//! oo oo oo oo        to this position
//! ...             directory trees
//! ```
//!
//! The serializer keeps strict byte-order discipline: JPEG-level fields are
//! big-endian, everything from the TIFF header on follows the segment's own
//! byte order, and the stream's previous mode is restored on the way out.

use std::collections::BTreeSet;
use std::fmt;
use std::io::{Seek, Write};

use bytes::Bytes;
use tracing::debug;

use crate::error::{FileError, TiffError};
use crate::io::{ByteOrder, ByteStream, MemoryStream};
use crate::tiff::{tag, tag_name, Directory, SubIfdTags, TiffHeader};

use super::segment::RawSegment;

// =============================================================================
// IfdPath
// =============================================================================

/// The location of one directory inside a segment: an index into the
/// top-level chain plus a sequence of (pointer tag, child index) descents.
///
/// IFD0 is `[0]`, IFD1 is `[1]`, the EXIF IFD is `[0] / (34665, 0)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdPath {
    main: usize,
    steps: Vec<(u16, usize)>,
}

impl IfdPath {
    /// A top-level directory in the main chain.
    pub fn main_chain(index: usize) -> Self {
        IfdPath {
            main: index,
            steps: Vec::new(),
        }
    }

    /// The primary image directory.
    pub fn ifd0() -> Self {
        Self::main_chain(0)
    }

    /// The thumbnail directory.
    pub fn ifd1() -> Self {
        Self::main_chain(1)
    }

    /// The EXIF-specific IFD under IFD0.
    pub fn exif_ifd() -> Self {
        Self::ifd0().child(tag::EXIF_IFD_POINTER, 0)
    }

    /// The GPS IFD under IFD0.
    pub fn gps_ifd() -> Self {
        Self::ifd0().child(tag::GPS_IFD_POINTER, 0)
    }

    /// The interoperability IFD, which hangs off the EXIF IFD.
    pub fn interop_ifd() -> Self {
        Self::exif_ifd().child(tag::INTEROP_IFD_POINTER, 0)
    }

    /// Descend one sub-IFD level.
    pub fn child(mut self, tag: u16, index: usize) -> Self {
        self.steps.push((tag, index));
        self
    }

    pub fn main(&self) -> usize {
        self.main
    }

    pub fn steps(&self) -> &[(u16, usize)] {
        &self.steps
    }
}

impl fmt::Display for IfdPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IFD{}", self.main)?;
        for &(tag, index) in &self.steps {
            match tag_name(tag) {
                Some(name) => write!(f, "/{}", name)?,
                None => write!(f, "/Tag{}", tag)?,
            }
            if index > 0 {
                write!(f, "[{}]", index)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// TiffSegment
// =============================================================================

/// An application segment reinterpreted as TIFF directory trees.
#[derive(Debug, Clone, PartialEq)]
pub struct TiffSegment {
    marker: u16,
    ident: String,
    byte_order: ByteOrder,
    dirs: Vec<Directory>,
}

impl TiffSegment {
    /// An empty segment with no directories, written little-endian.
    pub fn new(marker: u16, ident: &str) -> Self {
        TiffSegment {
            marker,
            ident: ident.to_string(),
            byte_order: ByteOrder::LittleEndian,
            dirs: Vec::new(),
        }
    }

    pub fn marker(&self) -> u16 {
        self.marker
    }

    pub fn ident(&self) -> &str {
        &self.ident
    }

    /// The byte order the segment was parsed with and will be written in.
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }

    pub fn directories(&self) -> &[Directory] {
        &self.dirs
    }

    pub fn directories_mut(&mut self) -> &mut [Directory] {
        &mut self.dirs
    }

    // -------------------------------------------------------------------------
    // Parse
    // -------------------------------------------------------------------------

    /// Parse segment payload bytes starting at the TIFF header.
    ///
    /// Top-level directories are followed along the next-directory chain
    /// until it reaches zero or points past the payload. A shared visited
    /// set rejects duplicate directory offsets across the whole segment.
    pub fn parse(
        marker: u16,
        ident: &str,
        payload: Bytes,
        sub_ifd_tags: &SubIfdTags,
    ) -> Result<Self, TiffError> {
        let payload_len = payload.len() as u64;
        let mut stream = MemoryStream::memory(payload.to_vec());

        let header = TiffHeader::read(&mut stream)?;

        let mut dirs = Vec::new();
        let mut visited = BTreeSet::new();
        let mut offset = header.first_ifd_offset;
        while offset != 0 && (offset as u64) < payload_len {
            let index = dirs.len() as u16;
            let (dir, next) =
                Directory::read(&mut stream, 0, offset, 0, index, sub_ifd_tags, &mut visited)?;
            dirs.push(dir);
            offset = next;
        }

        debug!(
            marker,
            ident,
            directories = dirs.len(),
            byte_order = ?header.byte_order,
            "parsed TIFF segment"
        );

        Ok(TiffSegment {
            marker,
            ident: ident.to_string(),
            byte_order: header.byte_order,
            dirs,
        })
    }

    /// Reinterpret a raw segment's bytes as TIFF directories.
    pub fn from_raw(raw: &RawSegment, sub_ifd_tags: &SubIfdTags) -> Result<Self, TiffError> {
        let payload = raw.tiff_payload().unwrap_or_else(Bytes::new);
        Self::parse(raw.marker(), raw.ident(), payload, sub_ifd_tags)
    }

    // -------------------------------------------------------------------------
    // Serialize
    // -------------------------------------------------------------------------

    /// Write the whole segment at the current position, restoring the
    /// stream's byte-order mode afterwards whatever the outcome.
    pub fn serialize<S: Write + Seek>(&mut self, stream: &mut ByteStream<S>) -> Result<(), FileError> {
        let saved = stream.set_byte_order(ByteOrder::BigEndian);
        let result = self.serialize_inner(stream);
        stream.set_byte_order(saved);
        result
    }

    fn serialize_inner<S: Write + Seek>(
        &mut self,
        stream: &mut ByteStream<S>,
    ) -> Result<(), FileError> {
        stream.write_u16(self.marker)?;
        let length_pos = stream.position()?;
        stream.write_u16(0)?;

        stream.write_all(self.ident.as_bytes())?;
        stream.write_u8(0)?;
        if (self.ident.len() + 1) % 2 == 1 {
            stream.write_u8(0)?;
        }

        // Directory offsets are relative to here.
        let origin = stream.position()?;
        let header = TiffHeader {
            byte_order: self.byte_order,
            first_ifd_offset: 0,
        };
        header.write(stream)?;

        // Chain the top-level directories: the header's first-IFD field is
        // the first link slot, each directory's next-link slot the next.
        let mut link_slot = origin + 4;
        for dir in self.dirs.iter_mut() {
            let placement = dir.write_tree(stream, origin)?;
            stream.patch_u32(link_slot, placement.start)?;
            link_slot = placement.next_link;
        }

        let end = stream.position()?;
        let length = end - length_pos;
        if length > 0xFFFF {
            return Err(FileError::SegmentOverflow { len: length });
        }
        stream.set_byte_order(ByteOrder::BigEndian);
        stream.patch_u16(length_pos, length as u16)?;

        debug!(
            marker = self.marker,
            ident = %self.ident,
            length,
            "serialized TIFF segment"
        );

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// The directory at a path, if the whole path exists.
    pub fn ifd(&self, path: &IfdPath) -> Option<&Directory> {
        let mut dir = self.dirs.get(path.main())?;
        for &(tag, index) in path.steps() {
            dir = dir.child(tag, index)?;
        }
        Some(dir)
    }

    pub fn ifd_mut(&mut self, path: &IfdPath) -> Option<&mut Directory> {
        let mut dir = self.dirs.get_mut(path.main())?;
        for &(tag, index) in path.steps() {
            dir = dir.child_mut(tag, index)?;
        }
        Some(dir)
    }

    /// The directory at a path, creating every missing directory along the
    /// way: empty top-level siblings up to the main index, then empty
    /// children per descent step.
    pub fn create_ifd(&mut self, path: &IfdPath) -> &mut Directory {
        while self.dirs.len() <= path.main() {
            let index = self.dirs.len() as u16;
            self.dirs.push(Directory::new(0, index));
        }
        let mut dir = &mut self.dirs[path.main()];
        for &(tag, index) in path.steps() {
            dir = dir.child_or_create(tag, index);
        }
        dir
    }
}

// =============================================================================
// Tests
// =============================================================================
