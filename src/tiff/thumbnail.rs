//! Embedded thumbnails: JPEG blobs and uncompressed strip images.
//!
//! A directory carries at most one thumbnail, described by its own tags:
//! compression 6 means a ready JPEG stream addressed by the interchange
//! format tags (513/514), compression 1 means raw 8-bit pixels stored as
//! strips addressed by the StripOffsets/StripByteCounts arrays. Either way
//! the material must fit under [`THUMBNAIL_CEILING`].
//!
//! Materialization failures never fail the surrounding directory parse: a
//! broken or oversized thumbnail degrades to "no thumbnail" with a warning.

use std::io::{Read, Seek, Write};

use bytes::Bytes;
use tracing::warn;

use crate::error::TiffError;
use crate::io::ByteStream;

use super::directory::Directory;
use super::tags::{self, tag};

// =============================================================================
// Constants
// =============================================================================

/// Largest thumbnail payload, compressed or raw, that is kept. Strictly
/// under the 65535-byte JPEG segment limit so a thumbnail alone can never
/// push a segment into overflow.
pub const THUMBNAIL_CEILING: usize = 0xFFF0;

// =============================================================================
// Thumbnail
// =============================================================================

/// One embedded thumbnail, in whichever of the two storage forms the
/// directory uses.
#[derive(Debug, Clone, PartialEq)]
pub enum Thumbnail {
    /// Uncompressed 8-bit pixels stored as strips
    Strips(StripImage),

    /// A complete JPEG stream stored verbatim
    Jpeg(Bytes),
}

impl Thumbnail {
    /// Size of the stored material in bytes.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            Thumbnail::Strips(image) => image.pixels.len(),
            Thumbnail::Jpeg(blob) => blob.len(),
        }
    }

    /// The compression tag value this storage form is written with.
    pub fn compression(&self) -> u16 {
        match self {
            Thumbnail::Strips(_) => tags::COMPRESSION_NONE,
            Thumbnail::Jpeg(_) => tags::COMPRESSION_JPEG,
        }
    }
}

// =============================================================================
// StripImage
// =============================================================================

/// An uncompressed raster held as one contiguous pixel buffer.
///
/// Samples are 8-bit; a scanline is `width × channels` bytes and the buffer
/// holds `height` scanlines back to back.
#[derive(Debug, Clone, PartialEq)]
pub struct StripImage {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub pixels: Bytes,
}

impl StripImage {
    /// Bytes per scanline.
    pub fn scanline_size(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    /// The strips this image splits into for a given RowsPerStrip value.
    ///
    /// Without a RowsPerStrip tag (or with a degenerate zero) the whole
    /// buffer is one strip. The last strip may be short.
    pub fn strips(&self, rows_per_strip: Option<u32>) -> std::slice::Chunks<'_, u8> {
        let rows = match rows_per_strip {
            Some(r) if r > 0 => r as usize,
            _ => self.height.max(1) as usize,
        };
        let size = (rows * self.scanline_size()).max(1);
        self.pixels.chunks(size)
    }

    /// Number of strips for a given RowsPerStrip value.
    pub fn strip_count(&self, rows_per_strip: Option<u32>) -> usize {
        self.strips(rows_per_strip).count()
    }
}

// =============================================================================
// Materialization (directory read path)
// =============================================================================

/// Try to materialize the thumbnail a parsed directory describes.
///
/// Returns `None` both when the directory simply has no thumbnail tags and
/// when the material is broken (zero length, over the ceiling, short read);
/// the latter cases log a warning. Never fails the surrounding parse.
pub(crate) fn materialize<S: Read + Seek>(
    dir: &Directory,
    stream: &mut ByteStream<S>,
    origin: u64,
) -> Option<Thumbnail> {
    let compression = dir.tag_u32(tag::COMPRESSION)?;

    let result = if compression == u32::from(tags::COMPRESSION_JPEG) {
        read_jpeg_blob(dir, stream, origin)
    } else if compression == u32::from(tags::COMPRESSION_NONE) {
        read_strip_image(dir, stream, origin)
    } else {
        return None;
    };

    match result {
        Ok(thumbnail) => thumbnail,
        Err(e) => {
            warn!(
                ifd_tag = dir.tag(),
                error = %e,
                "failed to read embedded thumbnail, dropping it"
            );
            None
        }
    }
}

/// Read the JPEG interchange blob addressed by tags 513/514.
fn read_jpeg_blob<S: Read + Seek>(
    dir: &Directory,
    stream: &mut ByteStream<S>,
    origin: u64,
) -> Result<Option<Thumbnail>, TiffError> {
    let (offset, length) = match (
        dir.tag_u32(tag::JPEG_INTERCHANGE_FORMAT),
        dir.tag_u32(tag::JPEG_INTERCHANGE_FORMAT_LENGTH),
    ) {
        (Some(offset), Some(length)) => (offset, length),
        _ => return Ok(None),
    };

    if length == 0 || length as usize > THUMBNAIL_CEILING {
        warn!(
            ifd_tag = dir.tag(),
            length, "thumbnail JPEG length out of range, dropping it"
        );
        return Ok(None);
    }

    stream.seek_to(origin + offset as u64)?;
    let blob = stream.read_vec(length as usize)?;
    Ok(Some(Thumbnail::Jpeg(Bytes::from(blob))))
}

/// Read the uncompressed strip image addressed by the strip arrays.
fn read_strip_image<S: Read + Seek>(
    dir: &Directory,
    stream: &mut ByteStream<S>,
    origin: u64,
) -> Result<Option<Thumbnail>, TiffError> {
    let (width, height) = match (dir.tag_u32(tag::IMAGE_WIDTH), dir.tag_u32(tag::IMAGE_LENGTH)) {
        (Some(w), Some(h)) => (w, h),
        _ => return Ok(None),
    };
    let (offsets, counts) = match (
        dir.tag_u32s(tag::STRIP_OFFSETS),
        dir.tag_u32s(tag::STRIP_BYTE_COUNTS),
    ) {
        (Some(o), Some(c)) => (o, c),
        _ => return Ok(None),
    };
    let channels = dir.tag_u32(tag::SAMPLES_PER_PIXEL).unwrap_or(1);

    let total = width as u64 * height as u64 * channels as u64;
    if total == 0 || total > THUMBNAIL_CEILING as u64 {
        warn!(
            ifd_tag = dir.tag(),
            bytes = total,
            "thumbnail strip image size out of range, dropping it"
        );
        return Ok(None);
    }
    if offsets.len() != counts.len() {
        warn!(
            ifd_tag = dir.tag(),
            offsets = offsets.len(),
            counts = counts.len(),
            "strip offset/byte-count arrays disagree, dropping thumbnail"
        );
        return Ok(None);
    }

    let mut pixels = vec![0u8; total as usize];
    let mut filled = 0usize;
    for (&offset, &count) in offsets.iter().zip(counts.iter()) {
        let count = count as usize;
        if filled + count > pixels.len() {
            warn!(
                ifd_tag = dir.tag(),
                "strip byte counts exceed the image size, dropping thumbnail"
            );
            return Ok(None);
        }
        stream.seek_to(origin + offset as u64)?;
        stream.read_exact(&mut pixels[filled..filled + count])?;
        filled += count;
    }

    Ok(Some(Thumbnail::Strips(StripImage {
        width,
        height,
        channels,
        pixels: Bytes::from(pixels),
    })))
}

// =============================================================================
// Strip writer (directory write path)
// =============================================================================

/// Write the pixel buffer as strips at the current position.
///
/// Returns the origin-relative offset and the byte count of each strip, in
/// order, for the caller to patch into the reserved StripOffsets and
/// StripByteCounts slots.
pub(crate) fn write_strips<S: Write + Seek>(
    image: &StripImage,
    stream: &mut ByteStream<S>,
    origin: u64,
    rows_per_strip: Option<u32>,
) -> Result<(Vec<u32>, Vec<u32>), TiffError> {
    let mut offsets = Vec::new();
    let mut counts = Vec::new();

    for strip in image.strips(rows_per_strip) {
        let position = stream.position()?;
        offsets.push((position - origin) as u32);
        counts.push(strip.len() as u32);
        stream.write_all(strip)?;
    }

    Ok((offsets, counts))
}

// =============================================================================
// Tests
// =============================================================================
