//! JPEG file structure: markers, application segments, and the whole-file
//! façade.
//!
//! A JPEG file is a marker stream:
//!
//! ```text
//! FFD8            SOI
//! FFEn LLLL ...   application segments (metadata lives here)
//! FFFE LLLL ...   comments
//! FFDB/FFC4/FFCn  quantization/Huffman/frame tables
//! FFDA ...        SOS, entropy-coded image data
//! FFD9            EOI
//! ```
//!
//! Metadata scanning stops at the first structural marker: everything from
//! there to the end of the file is the image stream, carried as an opaque
//! blob and copied through verbatim on write. Marker values are 16-bit
//! big-endian words.

mod image_file;
mod manager;
mod segment;
mod tiff_segment;

pub use image_file::{ImageFile, ImageInfo};
pub use manager::AppSegmentManager;
pub use segment::{is_tiff_kind, AppSegment, RawSegment};
pub use tiff_segment::{IfdPath, TiffSegment};

// =============================================================================
// JPEG Markers
// =============================================================================

/// Start Of Image marker
pub const SOI: u16 = 0xFFD8;

/// End Of Image marker
pub const EOI: u16 = 0xFFD9;

/// Start Of Scan marker
pub const SOS: u16 = 0xFFDA;

/// Comment marker
pub const COM: u16 = 0xFFFE;

/// Define Huffman Table marker (inside the SOF numeric range)
pub const DHT: u16 = 0xFFC4;

/// Reserved JPG extension marker (inside the SOF numeric range)
pub const JPG: u16 = 0xFFC8;

/// Define Arithmetic Coding marker (inside the SOF numeric range)
pub const DAC: u16 = 0xFFCC;

/// Application segment 0 (JFIF) marker
pub const APP0: u16 = 0xFFE0;

/// Application segment 1 (Exif) marker
pub const APP1: u16 = 0xFFE1;

/// Application segment 3 (Meta) marker
pub const APP3: u16 = 0xFFE3;

/// Application segment 15 marker, the top of the APPn range
pub const APP15: u16 = 0xFFEF;

// =============================================================================
// Marker predicates
// =============================================================================

/// Whether a marker is an application segment (APP0 through APP15).
#[inline]
pub fn is_app_marker(marker: u16) -> bool {
    (APP0..=APP15).contains(&marker)
}

/// Whether a marker is a Start Of Frame variant.
///
/// The SOF family occupies 0xFFC0-0xFFCF except the three table markers
/// that share the range (DHT, JPG, DAC).
#[inline]
pub fn is_sof_marker(marker: u16) -> bool {
    matches!(marker, 0xFFC0..=0xFFCF) && marker != DHT && marker != JPG && marker != DAC
}
