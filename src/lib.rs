//! # exifkit
//!
//! An EXIF/TIFF metadata engine for JPEG files.
//!
//! This library parses the TIFF tag directories embedded in application
//! segments, lets you read, add, change and remove tags (including inside
//! nested sub-IFDs), and rewrites the file without recompressing the image
//! stream.
//!
//! ## Features
//!
//! - **Byte-exact round trips**: parsing a canonically laid out segment and
//!   serializing it again reproduces the input byte for byte
//! - **Both byte orders**: little- and big-endian TIFF structures, preserved
//!   on rewrite
//! - **Sub-IFD trees**: EXIF, GPS and interoperability directories, plus
//!   vendor trees through an extensible pointer-tag registry
//! - **Thumbnails**: embedded JPEG blobs and uncompressed strip images can
//!   be read, replaced and removed
//! - **Lossless editing**: segments the engine does not understand, comment
//!   segments and the image stream itself are carried through untouched
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`io`] - byte streams with a switchable byte-order register
//! - [`tiff`] - the directory engine: field types, tag values, IFD trees,
//!   thumbnails and the two-pass writer
//! - [`jpeg`] - segment handling and the whole-file
//!   [`ImageFile`](jpeg::ImageFile) facade
//! - [`config`] - CLI argument types
//! - [`error`] - error taxonomy, one enum per layer
//!
//! ## Example
//!
//! ```rust,no_run
//! use exifkit::jpeg::{IfdPath, ImageFile};
//! use exifkit::tiff::{tag, TagValue};
//!
//! fn main() -> Result<(), exifkit::error::FileError> {
//!     let mut file = ImageFile::open("photo.jpg")?;
//!
//!     // Read a tag from the EXIF sub-IFD.
//!     if let Some(exposure) = file.tag_value(&IfdPath::exif_ifd(), tag::EXPOSURE_TIME) {
//!         println!("exposure: {}", exposure);
//!     }
//!
//!     // Change the orientation and save. The pixel data is untouched.
//!     file.set_tag_value(&IfdPath::ifd0(), tag::ORIENTATION, TagValue::short(6));
//!     file.save("edited.jpg")?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod jpeg;
pub mod tiff;

// Re-export commonly used types
pub use error::{CannotRationalize, FileError, StreamError, TiffError};
pub use io::{ByteOrder, ByteStream, FileStream, MemoryStream};
pub use jpeg::{
    is_tiff_kind, AppSegment, AppSegmentManager, IfdPath, ImageFile, ImageInfo, RawSegment,
    TiffSegment,
};
pub use tiff::{
    rationalize, rationalize_signed, tag, tag_name, DirEntry, DirPlacement, Directory, FieldType,
    StripImage, SubIfdTags, TagValue, Thumbnail, TiffHeader, COMPRESSION_JPEG, COMPRESSION_NONE,
    MAX_DIR_ENTRIES, RATIONALIZE_TOLERANCE, THUMBNAIL_CEILING, TIFF_HEADER_SIZE, TIFF_VERSION,
};
