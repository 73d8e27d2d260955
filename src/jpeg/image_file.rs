//! Whole-file reading, writing and the metadata façade.
//!
//! An image file decomposes into four parts, carried separately so each can
//! be edited without disturbing the others:
//!
//! ```text
//! FF D8      SOI
//! FF En ...  application segments (APP0-APP15), kept ascending by marker
//! FF FE ...  comment segments, in arrival order
//! FF C0 ...  image stream: frame headers, tables and entropy-coded scans,
//! ...        carried as one opaque block
//! FF D9      EOI (part of the image stream)
//! ```
//!
//! The image stream is never re-encoded; editing metadata and saving yields
//! the exact pixel bytes that were read. Only the segment block is rebuilt,
//! and within it only segments that were actually parsed into directory
//! trees; raw segments round-trip byte for byte.

use std::io::{Read, Seek, Write};
use std::path::Path;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tracing::debug;

use crate::error::{FileError, StreamError};
use crate::io::{ByteOrder, ByteStream, FileStream};
use crate::tiff::{
    tag, Directory, StripImage, SubIfdTags, TagValue, Thumbnail, COMPRESSION_JPEG,
    COMPRESSION_NONE, THUMBNAIL_CEILING,
};

use super::manager::AppSegmentManager;
use super::segment::{AppSegment, RawSegment};
use super::tiff_segment::{IfdPath, TiffSegment};
use super::{is_app_marker, is_sof_marker, APP1, COM, EOI, SOI, SOS};

/// Quality used when a thumbnail is compressed from pixels.
const THUMBNAIL_JPEG_QUALITY: u8 = 90;

// =============================================================================
// ImageInfo
// =============================================================================

/// Frame properties scanned from the first start-of-frame marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Frame width in pixels
    pub width: u16,
    /// Frame height in pixels
    pub height: u16,
    /// Number of components (1 = grayscale, 3 = YCbCr)
    pub channels: u8,
    /// Sample precision in bits
    pub precision: u8,
}

// =============================================================================
// ImageFile
// =============================================================================

/// One image file: its segments, comments and untouched image stream.
///
/// This is the top-level entry point. Typical use reads a file, edits tags
/// through the path-based accessors, and saves:
///
/// ```no_run
/// use exifkit::jpeg::{IfdPath, ImageFile};
/// use exifkit::tiff::{tag, TagValue};
///
/// # fn main() -> Result<(), exifkit::error::FileError> {
/// let mut file = ImageFile::open("photo.jpg")?;
/// file.set_tag_value(&IfdPath::ifd0(), tag::ORIENTATION, TagValue::short(6));
/// file.save("rotated.jpg")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ImageFile {
    segments: AppSegmentManager,
    comments: Vec<Bytes>,
    image_stream: Option<Bytes>,
    info: Option<ImageInfo>,
    sub_ifd_tags: SubIfdTags,
}

impl ImageFile {
    /// An empty file with no segments and no image stream. Writing it out
    /// requires an image stream to be supplied first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileError> {
        let mut stream = FileStream::open(path)?;
        Self::read(&mut stream)
    }

    // -------------------------------------------------------------------------
    // Read
    // -------------------------------------------------------------------------

    /// Read a file from a stream positioned at its start.
    ///
    /// Application segments are captured raw (parsing into directory trees
    /// happens lazily on first tag access), comments are collected, and
    /// everything from the first structural marker on is kept as one opaque
    /// image stream.
    pub fn read<S: Read + Seek>(stream: &mut ByteStream<S>) -> Result<Self, FileError> {
        stream.set_byte_order(ByteOrder::BigEndian);

        if stream.read_u16()? != SOI {
            return Err(FileError::MissingSoi);
        }

        let mut file = ImageFile::new();
        let mut image_start = None;
        loop {
            let marker_pos = stream.position()?;
            let marker = match stream.read_u16() {
                Ok(m) => m,
                // A header-only stream simply has no image data.
                Err(StreamError::UnexpectedEof { .. }) => break,
                Err(e) => return Err(e.into()),
            };

            if is_app_marker(marker) {
                let segment = RawSegment::read(stream, marker)?;
                debug!(
                    marker,
                    ident = segment.ident(),
                    size = segment.data().len(),
                    "read application segment"
                );
                file.segments.insert(AppSegment::Raw(segment));
            } else if marker == COM {
                let len = stream.read_u16()?;
                if len < 2 {
                    return Err(FileError::BadSegmentLength { marker, len });
                }
                let payload = stream.read_vec(len as usize - 2)?;
                file.comments.push(Bytes::from(payload));
            } else {
                image_start = Some(marker_pos);
                break;
            }
        }

        if let Some(start) = image_start {
            file.info = scan_image_info(stream, start)?;
            let end = stream.len()?;
            stream.seek_to(start)?;
            let data = stream.read_vec((end - start) as usize)?;
            file.image_stream = Some(Bytes::from(data));
        }

        debug!(
            segments = file.segments.len(),
            comments = file.comments.len(),
            has_image = file.image_stream.is_some(),
            "read image file"
        );
        Ok(file)
    }

    // -------------------------------------------------------------------------
    // Write
    // -------------------------------------------------------------------------

    /// Write the file to a stream: SOI, segments ascending by marker,
    /// comments, then the image stream verbatim.
    pub fn write<S: Write + Seek>(&mut self, stream: &mut ByteStream<S>) -> Result<(), FileError> {
        let image_stream = self.image_stream.clone().ok_or(FileError::NoImageData)?;
        self.sync_dimension_tags();

        stream.set_byte_order(ByteOrder::BigEndian);
        stream.write_u16(SOI)?;
        for segment in self.segments.iter_mut() {
            segment.write(stream)?;
        }
        for comment in &self.comments {
            let len = comment.len() as u64 + 2;
            if len > 0xFFFF {
                return Err(FileError::SegmentOverflow { len });
            }
            stream.write_u16(COM)?;
            stream.write_u16(len as u16)?;
            stream.write_all(comment)?;
        }
        stream.write_all(&image_stream)?;

        debug!(
            segments = self.segments.len(),
            comments = self.comments.len(),
            "wrote image file"
        );
        Ok(())
    }

    /// Write the file to disk, creating or truncating `path`.
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), FileError> {
        let mut stream = FileStream::create(path)?;
        self.write(&mut stream)
    }

    /// Keep the EXIF pixel-dimension tags in line with the scanned frame
    /// header. Only a segment that is already parsed is touched; raw
    /// segments round-trip byte for byte.
    fn sync_dimension_tags(&mut self) {
        let Some(info) = self.info else {
            return;
        };
        let Some(segment) = self.segments.find_mut(APP1, "Exif") else {
            return;
        };
        let Some(tiff) = segment.as_tiff_mut() else {
            return;
        };
        let exif = tiff.create_ifd(&IfdPath::exif_ifd());
        exif.set_tag_value(tag::PIXEL_X_DIMENSION, TagValue::long(info.width as u32));
        exif.set_tag_value(tag::PIXEL_Y_DIMENSION, TagValue::long(info.height as u32));
    }

    // -------------------------------------------------------------------------
    // Tag access
    // -------------------------------------------------------------------------

    /// The primary metadata segment (APP1 "Exif"), converting its raw bytes
    /// into directory trees on first access. `None` when the segment is
    /// absent or its bytes are not valid TIFF.
    pub fn exif_segment(&mut self) -> Option<&TiffSegment> {
        self.segments
            .find_converting(APP1, "Exif", &self.sub_ifd_tags)
            .and_then(|s| s.as_tiff())
    }

    pub fn exif_segment_mut(&mut self) -> Option<&mut TiffSegment> {
        self.segments
            .find_converting(APP1, "Exif", &self.sub_ifd_tags)
            .and_then(AppSegment::as_tiff_mut)
    }

    /// Read one tag from the primary metadata segment.
    pub fn tag_value(&mut self, path: &IfdPath, tag: u16) -> Option<&TagValue> {
        self.exif_segment()?.ifd(path)?.tag_value(tag)
    }

    /// Write one tag, creating the segment and any missing directories along
    /// the path.
    pub fn set_tag_value(&mut self, path: &IfdPath, tag: u16, value: TagValue) {
        let tiff = self
            .segments
            .find_or_insert_tiff(APP1, "Exif", &self.sub_ifd_tags);
        tiff.create_ifd(path).set_tag_value(tag, value);
    }

    /// Remove one tag. Returns whether anything was removed.
    pub fn remove_tag(&mut self, path: &IfdPath, tag: u16) -> bool {
        let Some(tiff) = self.exif_segment_mut() else {
            return false;
        };
        match tiff.ifd_mut(path) {
            Some(dir) => dir.remove_tag(tag),
            None => false,
        }
    }

    /// Every tag in the primary metadata segment, paired with the path of
    /// the directory holding it. Depth-first: a directory's own entries come
    /// before its children's.
    pub fn all_tags(&mut self) -> Vec<(IfdPath, u16, TagValue)> {
        let mut out = Vec::new();
        if let Some(segment) = self.exif_segment() {
            for (index, dir) in segment.directories().iter().enumerate() {
                collect_tags(dir, IfdPath::main_chain(index), &mut out);
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Thumbnail
    // -------------------------------------------------------------------------

    /// The embedded thumbnail, if IFD1 carries one.
    pub fn thumbnail(&mut self) -> Option<&Thumbnail> {
        self.exif_segment()?.ifd(&IfdPath::ifd1())?.thumbnail()
    }

    /// Attach a ready-made JPEG stream as the thumbnail, creating IFD1 as
    /// needed. The blob must be non-empty and fit the segment ceiling.
    pub fn set_thumbnail_jpeg(&mut self, blob: Bytes) -> Result<(), FileError> {
        if blob.is_empty() || blob.len() > THUMBNAIL_CEILING {
            return Err(FileError::ThumbnailTooLarge {
                size: blob.len(),
                max: THUMBNAIL_CEILING,
            });
        }
        let tiff = self
            .segments
            .find_or_insert_tiff(APP1, "Exif", &self.sub_ifd_tags);
        let dir = tiff.create_ifd(&IfdPath::ifd1());
        dir.set_tag_value(tag::COMPRESSION, TagValue::short(COMPRESSION_JPEG));
        dir.set_thumbnail(Some(Thumbnail::Jpeg(blob)));
        Ok(())
    }

    /// Attach an RGB image as the thumbnail, either JPEG-compressed at
    /// quality 90 or stored as uncompressed strips with the companion
    /// geometry tags.
    pub fn set_thumbnail_image(
        &mut self,
        image: &RgbImage,
        compress: bool,
    ) -> Result<(), FileError> {
        if compress {
            let mut encoded = Vec::new();
            let mut encoder = JpegEncoder::new_with_quality(&mut encoded, THUMBNAIL_JPEG_QUALITY);
            encoder
                .encode_image(image)
                .map_err(|e| FileError::Image(e.to_string()))?;
            return self.set_thumbnail_jpeg(Bytes::from(encoded));
        }

        let size = image.width() as u64 * image.height() as u64 * 3;
        if size == 0 || size > THUMBNAIL_CEILING as u64 {
            return Err(FileError::ThumbnailTooLarge {
                size: size as usize,
                max: THUMBNAIL_CEILING,
            });
        }
        let strips = StripImage {
            width: image.width(),
            height: image.height(),
            channels: 3,
            pixels: Bytes::from(image.as_raw().clone()),
        };

        let tiff = self
            .segments
            .find_or_insert_tiff(APP1, "Exif", &self.sub_ifd_tags);
        let dir = tiff.create_ifd(&IfdPath::ifd1());
        dir.set_tag_value(tag::IMAGE_WIDTH, TagValue::long(strips.width));
        dir.set_tag_value(tag::IMAGE_LENGTH, TagValue::long(strips.height));
        dir.set_tag_value(tag::BITS_PER_SAMPLE, TagValue::Short(vec![8, 8, 8]));
        dir.set_tag_value(tag::COMPRESSION, TagValue::short(COMPRESSION_NONE));
        dir.set_tag_value(tag::PHOTOMETRIC_INTERPRETATION, TagValue::short(2));
        dir.set_tag_value(tag::SAMPLES_PER_PIXEL, TagValue::short(3));
        dir.set_thumbnail(Some(Thumbnail::Strips(strips)));
        Ok(())
    }

    /// Drop the thumbnail from IFD1. Its storage bookkeeping tags are
    /// pruned at the next write. Returns whether one was present.
    pub fn remove_thumbnail(&mut self) -> bool {
        let Some(tiff) = self.exif_segment_mut() else {
            return false;
        };
        let Some(dir) = tiff.ifd_mut(&IfdPath::ifd1()) else {
            return false;
        };
        let had = dir.thumbnail().is_some();
        dir.set_thumbnail(None);
        had
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// Comment segment payloads, in file order.
    pub fn comments(&self) -> &[Bytes] {
        &self.comments
    }

    pub fn comments_mut(&mut self) -> &mut Vec<Bytes> {
        &mut self.comments
    }

    pub fn add_comment(&mut self, text: impl Into<Bytes>) {
        self.comments.push(text.into());
    }

    /// Frame properties, if an image stream with a frame header was read.
    pub fn info(&self) -> Option<ImageInfo> {
        self.info
    }

    /// The untouched image stream, from the first structural marker to the
    /// end of the file.
    pub fn image_stream(&self) -> Option<&Bytes> {
        self.image_stream.as_ref()
    }

    /// Replace the image stream. The bytes are carried verbatim; they must
    /// form a complete marker sequence through EOI.
    pub fn set_image_stream(&mut self, data: Bytes) {
        self.image_stream = Some(data);
    }

    /// The pointer-tag registry consulted when segments are parsed. Register
    /// application-specific tags here before first tag access.
    pub fn sub_ifd_tags_mut(&mut self) -> &mut SubIfdTags {
        &mut self.sub_ifd_tags
    }

    pub fn segments(&self) -> &AppSegmentManager {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut AppSegmentManager {
        &mut self.segments
    }
}

/// Depth-first tag collection for [`ImageFile::all_tags`].
fn collect_tags(dir: &Directory, path: IfdPath, out: &mut Vec<(IfdPath, u16, TagValue)>) {
    for (tag, value) in dir.tags() {
        out.push((path.clone(), tag, value.clone()));
    }
    let child_tags: Vec<u16> = dir.child_tags().collect();
    for child_tag in child_tags {
        for (index, child) in dir.children(child_tag).iter().enumerate() {
            collect_tags(child, path.clone().child(child_tag, index), out);
        }
    }
}

/// Scan the image stream for the first start-of-frame marker and decode the
/// frame dimensions from it.
///
/// Stops without a result at start-of-scan (entropy-coded data follows,
/// where naive marker scanning would misfire), at EOI, or at anything that
/// is not a marker.
fn scan_image_info<S: Read + Seek>(
    stream: &mut ByteStream<S>,
    start: u64,
) -> Result<Option<ImageInfo>, FileError> {
    stream.seek_to(start)?;
    loop {
        let marker = match stream.read_u16() {
            Ok(m) => m,
            Err(StreamError::UnexpectedEof { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if (marker & 0xFF00) != 0xFF00 || marker == SOS || marker == EOI {
            return Ok(None);
        }
        let len = stream.read_u16()?;
        if len < 2 {
            return Err(FileError::BadSegmentLength { marker, len });
        }
        if is_sof_marker(marker) {
            let precision = stream.read_u8()?;
            let height = stream.read_u16()?;
            let width = stream.read_u16()?;
            let channels = stream.read_u8()?;
            return Ok(Some(ImageInfo {
                width,
                height,
                channels,
                precision,
            }));
        }
        stream.skip(len as i64 - 2)?;
    }
}

// =============================================================================
// Tests
// =============================================================================
