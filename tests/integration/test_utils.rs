//! Test utilities for integration tests.
//!
//! This module provides helper functions for creating test JPEG files and
//! hand-assembled TIFF segments. The wire fixtures are built byte by byte,
//! independent of the serializer under test, so parse tests exercise real
//! layouts rather than whatever the writer happens to produce.

use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, Luma, Rgb, RgbImage};

// =============================================================================
// JPEG Image Builders
// =============================================================================

/// Create a test JPEG image with a simple gradient pattern.
pub fn create_test_jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    let img = GrayImage::from_fn(width, height, |x, y| {
        let val = ((x + y) % 256) as u8;
        Luma([val])
    });

    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode_image(&img).unwrap();
    buf
}

/// Create a small RGB test image for thumbnail embedding.
pub fn create_test_rgb_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let r = (x % 256) as u8;
        let g = (y % 256) as u8;
        let b = ((x + y) % 256) as u8;
        Rgb([r, g, b])
    })
}

// =============================================================================
// Hand-Assembled TIFF Segments
// =============================================================================

/// A canonically laid out little-endian TIFF payload, assembled by hand.
///
/// One directory with three entries in ascending tag order, overflow data
/// word-aligned after the entry table in tag order:
///
/// - Make (271, ASCII, count 5): "Acme" + NUL, at offset 50
/// - Orientation (274, SHORT, count 1): inline value 1
/// - XResolution (282, RATIONAL, count 1): 72/1, at offset 56
///
/// Because the layout matches what the serializer emits, parsing and
/// re-serializing this payload must reproduce it byte for byte.
pub fn canonical_exif_payload() -> Vec<u8> {
    let mut v = Vec::new();
    // TIFF header: "II", version 42, first IFD at 8
    v.extend_from_slice(&[0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00]);
    // Entry count
    v.extend_from_slice(&[0x03, 0x00]);
    // 271 Make, ASCII, count 5, offset 50
    v.extend_from_slice(&[
        0x0F, 0x01, 0x02, 0x00, 0x05, 0x00, 0x00, 0x00, 0x32, 0x00, 0x00, 0x00,
    ]);
    // 274 Orientation, SHORT, count 1, inline value 1
    v.extend_from_slice(&[
        0x12, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00,
    ]);
    // 282 XResolution, RATIONAL, count 1, offset 56
    v.extend_from_slice(&[
        0x1A, 0x01, 0x05, 0x00, 0x01, 0x00, 0x00, 0x00, 0x38, 0x00, 0x00, 0x00,
    ]);
    // Next-directory link: none
    v.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    // Offset 50: "Acme" + NUL, then one alignment pad byte
    v.extend_from_slice(b"Acme\0");
    v.push(0x00);
    // Offset 56: 72/1
    v.extend_from_slice(&[0x48, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00]);
    v
}

/// A TIFF payload whose thumbnail bookkeeping is broken: the JPEG length
/// tag claims 65536 bytes, past the thumbnail ceiling. Parsing must still
/// succeed with the thumbnail dropped and the tags kept.
pub fn oversized_thumbnail_payload() -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&[0x49, 0x49, 0x2A, 0x00, 0x08, 0x00, 0x00, 0x00]);
    v.extend_from_slice(&[0x03, 0x00]);
    // 259 Compression, SHORT, count 1, inline value 6 (JPEG)
    v.extend_from_slice(&[
        0x03, 0x01, 0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00,
    ]);
    // 513 JPEGInterchangeFormat, LONG, count 1, offset 50
    v.extend_from_slice(&[
        0x01, 0x02, 0x04, 0x00, 0x01, 0x00, 0x00, 0x00, 0x32, 0x00, 0x00, 0x00,
    ]);
    // 514 JPEGInterchangeFormatLength, LONG, count 1, value 65536
    v.extend_from_slice(&[
        0x02, 0x02, 0x04, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00,
    ]);
    v.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    v
}

// =============================================================================
// JPEG File Assembly
// =============================================================================

/// Wrap a TIFF payload into complete APP1 "Exif" segment bytes, marker and
/// big-endian length included.
pub fn exif_app1_bytes(payload: &[u8]) -> Vec<u8> {
    let length = (2 + 6 + payload.len()) as u16;
    let mut v = vec![0xFF, 0xE1];
    v.extend_from_slice(&length.to_be_bytes());
    v.extend_from_slice(b"Exif\0\0");
    v.extend_from_slice(payload);
    v
}

/// Splice an APP1 "Exif" segment into a real encoded JPEG, right after SOI.
pub fn jpeg_with_exif(payload: &[u8]) -> Vec<u8> {
    let base = create_test_jpeg(32, 24, 80);
    let mut v = vec![0xFF, 0xD8];
    v.extend_from_slice(&exif_app1_bytes(payload));
    v.extend_from_slice(&base[2..]);
    v
}

// =============================================================================
// Validation Helpers
// =============================================================================

/// Check if data looks like a complete JPEG (SOI at the start, EOI at the
/// end).
pub fn is_valid_jpeg(data: &[u8]) -> bool {
    if data.len() < 4 {
        return false;
    }

    if data[0] != 0xFF || data[1] != 0xD8 {
        return false;
    }

    data[data.len() - 2] == 0xFF && data[data.len() - 1] == 0xD9
}
