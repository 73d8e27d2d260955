//! Segment-level round-trip tests.
//!
//! Tests verify:
//! - Parsing a canonically laid out payload and re-serializing it is
//!   byte for byte lossless
//! - serialize -> parse -> serialize is idempotent across all twelve
//!   wire types
//! - Big-endian segments survive a full round trip
//! - Sub-IFD pointer recursion is gated on the registry
//! - Rational values decode back to the exact floats they encoded

use bytes::Bytes;

use exifkit::jpeg::{IfdPath, TiffSegment, APP1};
use exifkit::tiff::{tag, SubIfdTags, TagValue};
use exifkit::{ByteOrder, MemoryStream};

use super::test_utils::canonical_exif_payload;

/// An application-specific pointer tag outside the well-known set.
const VENDOR_TREE: u16 = 50900;

fn serialize_bytes(segment: &mut TiffSegment) -> Vec<u8> {
    let mut stream = MemoryStream::empty();
    segment.serialize(&mut stream).unwrap();
    stream.into_vec()
}

/// Parse payload bytes (TIFF header onwards) as an APP1 "Exif" segment.
fn parse_payload(payload: &[u8], registry: &SubIfdTags) -> TiffSegment {
    TiffSegment::parse(APP1, "Exif", Bytes::from(payload.to_vec()), registry).unwrap()
}

// =============================================================================
// Canonical Payload
// =============================================================================

#[test]
fn test_canonical_payload_values() {
    let segment = parse_payload(&canonical_exif_payload(), &SubIfdTags::default());

    assert_eq!(segment.byte_order(), ByteOrder::LittleEndian);
    assert_eq!(segment.directories().len(), 1);

    let ifd0 = segment.ifd(&IfdPath::ifd0()).unwrap();
    assert_eq!(ifd0.tag_count(), 3);
    assert_eq!(
        ifd0.tag_value(tag::MAKE).and_then(TagValue::text),
        Some("Acme".to_string())
    );
    assert_eq!(ifd0.tag_value(tag::ORIENTATION), Some(&TagValue::short(1)));
    assert_eq!(
        ifd0.tag_value(tag::X_RESOLUTION).and_then(TagValue::floats),
        Some(vec![72.0])
    );
}

#[test]
fn test_canonical_payload_byte_identity() {
    let fixture = canonical_exif_payload();
    let mut segment = parse_payload(&fixture, &SubIfdTags::default());

    let bytes = serialize_bytes(&mut segment);

    // Marker, big-endian length, identifier, then the payload itself.
    assert_eq!(&bytes[..2], &[0xFF, 0xE1]);
    let length = u16::from_be_bytes([bytes[2], bytes[3]]) as usize;
    assert_eq!(length, bytes.len() - 2);
    assert_eq!(&bytes[4..10], b"Exif\0\0");
    assert_eq!(
        &bytes[10..],
        &fixture[..],
        "re-serialized payload must match the hand-assembled layout exactly"
    );
}

// =============================================================================
// Idempotence
// =============================================================================

#[test]
fn test_serialize_parse_serialize_idempotent() {
    let mut segment = TiffSegment::new(APP1, "Exif");

    let ifd0 = segment.create_ifd(&IfdPath::ifd0());
    ifd0.set_tag_value(tag::IMAGE_WIDTH, TagValue::long(640));
    ifd0.set_tag_value(tag::BITS_PER_SAMPLE, TagValue::Short(vec![8, 8, 8]));
    ifd0.set_tag_value(tag::MAKE, TagValue::ascii("Example Camera Co"));
    ifd0.set_tag_value(tag::X_RESOLUTION, TagValue::rational(72.0));
    ifd0.set_tag_value(700, TagValue::Byte(vec![1, 2, 3, 4, 5]));
    ifd0.set_tag_value(701, TagValue::SByte(vec![-1, 2, -3]));
    ifd0.set_tag_value(702, TagValue::undefined(vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00]));
    ifd0.set_tag_value(703, TagValue::SShort(vec![-5, 5]));
    ifd0.set_tag_value(704, TagValue::SLong(vec![-100_000]));
    ifd0.set_tag_value(705, TagValue::Float(vec![2.5, -0.25]));
    ifd0.set_tag_value(706, TagValue::Double(vec![3.141592653589793]));

    let exif = segment.create_ifd(&IfdPath::exif_ifd());
    exif.set_tag_value(tag::EXPOSURE_TIME, TagValue::rational(0.005));
    exif.set_tag_value(tag::SHUTTER_SPEED_VALUE, TagValue::srational(-0.5));
    exif.set_tag_value(tag::FLASH, TagValue::short(7));

    segment
        .create_ifd(&IfdPath::gps_ifd())
        .set_tag_value(2, TagValue::Rational(vec![51.0, 30.0, 12.5]));

    let first = serialize_bytes(&mut segment);
    let mut reparsed = parse_payload(&first[10..], &SubIfdTags::default());
    let second = serialize_bytes(&mut reparsed);

    assert_eq!(first, second, "round trip must be a fixed point");
}

// =============================================================================
// Byte Order
// =============================================================================

#[test]
fn test_big_endian_round_trip() {
    let mut segment = TiffSegment::new(APP1, "Exif");
    segment.set_byte_order(ByteOrder::BigEndian);

    let ifd0 = segment.create_ifd(&IfdPath::ifd0());
    ifd0.set_tag_value(tag::IMAGE_WIDTH, TagValue::long(1920));
    ifd0.set_tag_value(tag::MAKE, TagValue::ascii("Acme"));
    ifd0.set_tag_value(tag::X_RESOLUTION, TagValue::rational(300.0));

    let first = serialize_bytes(&mut segment);
    assert_eq!(&first[10..14], &[0x4D, 0x4D, 0x00, 0x2A]);

    let mut reparsed = parse_payload(&first[10..], &SubIfdTags::default());
    assert_eq!(reparsed.byte_order(), ByteOrder::BigEndian);

    let ifd0 = reparsed.ifd(&IfdPath::ifd0()).unwrap();
    assert_eq!(ifd0.tag_u32(tag::IMAGE_WIDTH), Some(1920));
    assert_eq!(
        ifd0.tag_value(tag::MAKE).and_then(TagValue::text),
        Some("Acme".to_string())
    );
    assert_eq!(
        ifd0.tag_value(tag::X_RESOLUTION).and_then(TagValue::floats),
        Some(vec![300.0])
    );

    let second = serialize_bytes(&mut reparsed);
    assert_eq!(first, second);
}

// =============================================================================
// Sub-IFD Trees
// =============================================================================

#[test]
fn test_three_children_under_one_pointer_tag() {
    let mut segment = TiffSegment::new(APP1, "Exif");
    for i in 0..3 {
        segment
            .create_ifd(&IfdPath::ifd0().child(tag::SUB_IFDS, i))
            .set_tag_value(tag::ORIENTATION, TagValue::short(i as u16 + 1));
    }

    let bytes = serialize_bytes(&mut segment);
    let reparsed = parse_payload(&bytes[10..], &SubIfdTags::default());

    let ifd0 = reparsed.ifd(&IfdPath::ifd0()).unwrap();
    // The pointer is structural: children only, no plain entry.
    assert!(ifd0.tag_value(tag::SUB_IFDS).is_none());
    assert_eq!(ifd0.children(tag::SUB_IFDS).len(), 3);
    for i in 0..3 {
        assert_eq!(
            reparsed
                .ifd(&IfdPath::ifd0().child(tag::SUB_IFDS, i))
                .and_then(|d| d.tag_value(tag::ORIENTATION)),
            Some(&TagValue::short(i as u16 + 1))
        );
    }
}

#[test]
fn test_registry_gates_pointer_recursion() {
    let mut segment = TiffSegment::new(APP1, "Exif");
    segment
        .create_ifd(&IfdPath::ifd0().child(VENDOR_TREE, 0))
        .set_tag_value(tag::ORIENTATION, TagValue::short(1));
    segment
        .create_ifd(&IfdPath::ifd0().child(VENDOR_TREE, 1))
        .set_tag_value(tag::ORIENTATION, TagValue::short(2));

    let bytes = serialize_bytes(&mut segment);

    // With the tag registered, both children come back as directories.
    let mut registry = SubIfdTags::default();
    registry.register(VENDOR_TREE);
    let recognized = parse_payload(&bytes[10..], &registry);
    let ifd0 = recognized.ifd(&IfdPath::ifd0()).unwrap();
    assert!(ifd0.tag_value(VENDOR_TREE).is_none());
    assert_eq!(ifd0.children(VENDOR_TREE).len(), 2);
    assert_eq!(
        recognized
            .ifd(&IfdPath::ifd0().child(VENDOR_TREE, 1))
            .and_then(|d| d.tag_value(tag::ORIENTATION)),
        Some(&TagValue::short(2))
    );

    // Without registration the same bytes parse as a plain LONG entry
    // holding two offsets.
    let unrecognized = parse_payload(&bytes[10..], &SubIfdTags::default());
    let ifd0 = unrecognized.ifd(&IfdPath::ifd0()).unwrap();
    assert!(ifd0.children(VENDOR_TREE).is_empty());
    let entry = ifd0.tag_value(VENDOR_TREE).unwrap();
    assert!(matches!(entry, TagValue::Long(offsets) if offsets.len() == 2));
}

// =============================================================================
// Value Edge Cases
// =============================================================================

#[test]
fn test_inline_offset_boundary() {
    let mut segment = TiffSegment::new(APP1, "Exif");
    let ifd0 = segment.create_ifd(&IfdPath::ifd0());
    // Four bytes pack into the value field; five spill to the data area.
    ifd0.set_tag_value(700, TagValue::Byte(vec![1, 2, 3, 4]));
    ifd0.set_tag_value(701, TagValue::Byte(vec![1, 2, 3, 4, 5]));

    let bytes = serialize_bytes(&mut segment);
    let reparsed = parse_payload(&bytes[10..], &SubIfdTags::default());

    let ifd0 = reparsed.ifd(&IfdPath::ifd0()).unwrap();
    assert_eq!(ifd0.tag_value(700), Some(&TagValue::Byte(vec![1, 2, 3, 4])));
    assert_eq!(
        ifd0.tag_value(701),
        Some(&TagValue::Byte(vec![1, 2, 3, 4, 5]))
    );
}

#[test]
fn test_ascii_embedded_nul_round_trips() {
    let mut segment = TiffSegment::new(APP1, "Exif");
    // "AB\0CD": the embedded NUL is data, only the terminator is implicit.
    let value = TagValue::Ascii(b"AB\0CD".to_vec());
    assert_eq!(value.count(), 6);
    segment
        .create_ifd(&IfdPath::ifd0())
        .set_tag_value(tag::MAKE, value.clone());

    let bytes = serialize_bytes(&mut segment);
    let reparsed = parse_payload(&bytes[10..], &SubIfdTags::default());

    let back = reparsed
        .ifd(&IfdPath::ifd0())
        .and_then(|d| d.tag_value(tag::MAKE))
        .unwrap();
    assert_eq!(back, &value);
    assert_eq!(back.count(), 6);
}

#[test]
fn test_rational_values_decode_to_exact_floats() {
    let mut segment = TiffSegment::new(APP1, "Exif");
    let exif = segment.create_ifd(&IfdPath::exif_ifd());
    exif.set_tag_value(tag::EXPOSURE_TIME, TagValue::rational(0.005));
    exif.set_tag_value(tag::SHUTTER_SPEED_VALUE, TagValue::srational(-0.5));
    let ifd0 = segment.create_ifd(&IfdPath::ifd0());
    ifd0.set_tag_value(tag::X_RESOLUTION, TagValue::rational(72.0));
    ifd0.set_tag_value(tag::Y_RESOLUTION, TagValue::rational(1.0 / 3.0));

    let bytes = serialize_bytes(&mut segment);
    let reparsed = parse_payload(&bytes[10..], &SubIfdTags::default());

    // 0.005 encodes as 1/200 and 1/3 as 1/3; dividing back reproduces the
    // original doubles bit for bit, so plain equality holds.
    let exif = reparsed.ifd(&IfdPath::exif_ifd()).unwrap();
    assert_eq!(
        exif.tag_value(tag::EXPOSURE_TIME),
        Some(&TagValue::Rational(vec![0.005]))
    );
    assert_eq!(
        exif.tag_value(tag::SHUTTER_SPEED_VALUE),
        Some(&TagValue::SRational(vec![-0.5]))
    );
    let ifd0 = reparsed.ifd(&IfdPath::ifd0()).unwrap();
    assert_eq!(
        ifd0.tag_value(tag::X_RESOLUTION),
        Some(&TagValue::Rational(vec![72.0]))
    );
    assert_eq!(
        ifd0.tag_value(tag::Y_RESOLUTION),
        Some(&TagValue::Rational(vec![1.0 / 3.0]))
    );
}
