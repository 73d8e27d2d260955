//! TIFF tag directories: the metadata core.
//!
//! This module implements the TIFF structure that EXIF application segments
//! embed: a header declaring byte order and pointing at the first Image File
//! Directory, directories holding typed tag entries, and sub-IFD trees
//! reachable through pointer tags.
//!
//! # Key Concepts
//!
//! - **Byte order**: the header's magic declares endianness (0x4949 "II" =
//!   little-endian, 0x4D4D "MM" = big-endian). Every multi-byte value in the
//!   segment is read and written in that order.
//!
//! - **Inline vs offset values**: a tag payload of at most 4 encoded bytes
//!   is packed into the entry's value field; anything larger lives in a
//!   trailing data area addressed by an origin-relative offset.
//!
//! - **Sub-IFDs**: recognized pointer tags (EXIF IFD, GPS IFD, ...) carry
//!   offsets to nested directories. Parsed trees hold them as children; the
//!   pointer entries are re-synthesized on write.
//!
//! - **Two-pass writing**: offsets are unknown until the pointed-at material
//!   is written, so the writer reserves zeroed slots and patches them.

mod directory;
mod header;
mod tags;
mod thumbnail;
mod value;

pub use directory::{DirPlacement, Directory, MAX_DIR_ENTRIES};
pub use header::{TiffHeader, TIFF_HEADER_SIZE, TIFF_VERSION};
pub use tags::{tag, tag_name, FieldType, SubIfdTags, COMPRESSION_JPEG, COMPRESSION_NONE};
pub use thumbnail::{StripImage, Thumbnail, THUMBNAIL_CEILING};
pub use value::{
    rationalize, rationalize_signed, DirEntry, TagValue, RATIONALIZE_TOLERANCE,
};
