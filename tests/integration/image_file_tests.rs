//! Whole-file integration tests.
//!
//! Tests verify:
//! - An unedited file writes back byte for byte
//! - Metadata edits leave foreign segments and the image stream untouched
//! - Thumbnails survive a full disk round trip in both storage modes
//! - Broken thumbnail bookkeeping is dropped without failing the read
//! - save/open work against real files

use bytes::Bytes;

use exifkit::jpeg::{IfdPath, ImageFile, TiffSegment, APP1};
use exifkit::tiff::{tag, TagValue, Thumbnail, COMPRESSION_NONE};
use exifkit::MemoryStream;

use super::test_utils::{
    canonical_exif_payload, create_test_jpeg, create_test_rgb_image, is_valid_jpeg,
    jpeg_with_exif, oversized_thumbnail_payload,
};

fn read_file(bytes: Vec<u8>) -> ImageFile {
    ImageFile::read(&mut MemoryStream::memory(bytes)).unwrap()
}

fn write_file(file: &mut ImageFile) -> Vec<u8> {
    let mut out = MemoryStream::empty();
    file.write(&mut out).unwrap();
    out.into_vec()
}

// =============================================================================
// Lossless Carriage
// =============================================================================

#[test]
fn test_unedited_file_round_trips_byte_identical() {
    let original = create_test_jpeg(64, 48, 85);
    let mut file = read_file(original.clone());

    let written = write_file(&mut file);
    assert_eq!(
        written, original,
        "reading and writing without edits must not change a single byte"
    );
}

#[test]
fn test_edit_preserves_foreign_segments_and_stream() {
    let original = jpeg_with_exif(&canonical_exif_payload());
    let mut file = read_file(original.clone());

    // The raw APP1 converts to directory trees on first access.
    assert_eq!(
        file.tag_value(&IfdPath::ifd0(), tag::MAKE)
            .and_then(TagValue::text),
        Some("Acme".to_string())
    );
    file.set_tag_value(&IfdPath::ifd0(), tag::ORIENTATION, TagValue::short(6));

    let written = write_file(&mut file);

    // The encoder's own APP0 segment must survive verbatim.
    let base = create_test_jpeg(32, 24, 80);
    assert_eq!(&base[2..4], &[0xFF, 0xE0]);
    let app0_len = u16::from_be_bytes([base[4], base[5]]) as usize;
    let app0 = &base[2..4 + app0_len];
    assert!(
        written.windows(app0.len()).any(|w| w == app0),
        "raw APP0 bytes must appear unmodified in the output"
    );

    let mut reread = read_file(written);
    assert_eq!(
        reread.tag_value(&IfdPath::ifd0(), tag::ORIENTATION),
        Some(&TagValue::short(6))
    );
    assert_eq!(
        reread
            .tag_value(&IfdPath::ifd0(), tag::MAKE)
            .and_then(TagValue::text),
        Some("Acme".to_string())
    );
    assert_eq!(file.image_stream(), reread.image_stream());
}

#[test]
fn test_comment_carry_through() {
    let mut file = read_file(create_test_jpeg(32, 32, 80));
    let stream_before = file.image_stream().cloned();
    file.add_comment(Bytes::from_static(b"processed"));

    let mut reread = read_file(write_file(&mut file));
    assert_eq!(reread.comments().len(), 1);
    assert_eq!(&reread.comments()[0][..], b"processed");
    assert_eq!(reread.image_stream().cloned(), stream_before);

    let passthrough = read_file(write_file(&mut reread));
    assert_eq!(passthrough.comments().len(), 1);
}

// =============================================================================
// Tag Editing End to End
// =============================================================================

#[test]
fn test_tag_edits_survive_round_trip() {
    let mut file = read_file(create_test_jpeg(48, 48, 85));
    file.set_tag_value(&IfdPath::ifd0(), tag::IMAGE_WIDTH, TagValue::long(42));
    file.set_tag_value(&IfdPath::ifd0(), tag::X_RESOLUTION, TagValue::rational(72.0));
    file.set_tag_value(&IfdPath::exif_ifd(), tag::FLASH, TagValue::short(7));

    let mut reread = read_file(write_file(&mut file));
    assert_eq!(
        reread.tag_value(&IfdPath::ifd0(), tag::IMAGE_WIDTH),
        Some(&TagValue::long(42))
    );
    assert_eq!(
        reread.tag_value(&IfdPath::ifd0(), tag::X_RESOLUTION),
        Some(&TagValue::rational(72.0))
    );
    assert_eq!(
        reread.tag_value(&IfdPath::exif_ifd(), tag::FLASH),
        Some(&TagValue::short(7))
    );
}

#[test]
fn test_dimension_sync_matches_frame_header() {
    let mut file = read_file(create_test_jpeg(40, 30, 80));
    let info = file.info().unwrap();
    assert_eq!((info.width, info.height, info.channels), (40, 30, 1));

    // Any edit creates the metadata segment; the writer then records the
    // frame dimensions in it.
    file.set_tag_value(&IfdPath::ifd0(), tag::ORIENTATION, TagValue::short(1));

    let mut reread = read_file(write_file(&mut file));
    assert_eq!(
        reread.tag_value(&IfdPath::exif_ifd(), tag::PIXEL_X_DIMENSION),
        Some(&TagValue::long(40))
    );
    assert_eq!(
        reread.tag_value(&IfdPath::exif_ifd(), tag::PIXEL_Y_DIMENSION),
        Some(&TagValue::long(30))
    );
}

#[test]
fn test_registered_vendor_tree_through_file() {
    const VENDOR_TREE: u16 = 50900;

    let mut segment = TiffSegment::new(APP1, "Exif");
    segment
        .create_ifd(&IfdPath::ifd0().child(VENDOR_TREE, 0))
        .set_tag_value(tag::ORIENTATION, TagValue::short(9));
    let mut seg_stream = MemoryStream::empty();
    segment.serialize(&mut seg_stream).unwrap();

    let base = create_test_jpeg(32, 24, 80);
    let mut bytes = vec![0xFF, 0xD8];
    bytes.extend_from_slice(&seg_stream.into_vec());
    bytes.extend_from_slice(&base[2..]);

    // Registered: the child parses as a directory.
    let mut file = read_file(bytes.clone());
    file.sub_ifd_tags_mut().register(VENDOR_TREE);
    assert_eq!(
        file.tag_value(&IfdPath::ifd0().child(VENDOR_TREE, 0), tag::ORIENTATION),
        Some(&TagValue::short(9))
    );
    assert!(file.tag_value(&IfdPath::ifd0(), VENDOR_TREE).is_none());

    // Unregistered: the pointer is just a LONG entry.
    let mut plain = read_file(bytes);
    let entry = plain.tag_value(&IfdPath::ifd0(), VENDOR_TREE).unwrap();
    assert!(matches!(entry, TagValue::Long(offsets) if offsets.len() == 1));
}

// =============================================================================
// Thumbnails
// =============================================================================

#[test]
fn test_jpeg_thumbnail_embed_and_extract() {
    let blob = create_test_jpeg(16, 16, 70);
    let mut file = read_file(create_test_jpeg(64, 48, 85));
    file.set_thumbnail_jpeg(Bytes::from(blob.clone())).unwrap();

    let mut reread = read_file(write_file(&mut file));
    match reread.thumbnail() {
        Some(Thumbnail::Jpeg(extracted)) => {
            assert_eq!(&extracted[..], &blob[..], "thumbnail bytes must be untouched");
            assert!(is_valid_jpeg(extracted));
        }
        other => panic!("expected JPEG thumbnail, got {:?}", other),
    }
}

#[test]
fn test_strip_thumbnail_embed_and_extract() {
    let image = create_test_rgb_image(20, 20);
    let mut file = read_file(create_test_jpeg(64, 48, 85));
    file.set_thumbnail_image(&image, false).unwrap();

    let mut reread = read_file(write_file(&mut file));
    match reread.thumbnail() {
        Some(Thumbnail::Strips(strips)) => {
            assert_eq!(strips.width, 20);
            assert_eq!(strips.height, 20);
            assert_eq!(strips.channels, 3);
            assert_eq!(&strips.pixels[..], image.as_raw().as_slice());
        }
        other => panic!("expected strip thumbnail, got {:?}", other),
    }
    assert_eq!(
        reread.tag_value(&IfdPath::ifd1(), tag::COMPRESSION),
        Some(&TagValue::short(COMPRESSION_NONE))
    );
    assert_eq!(reread.tag_value(&IfdPath::ifd1(), tag::IMAGE_WIDTH), Some(&TagValue::long(20)));
}

#[test]
fn test_compressed_thumbnail_is_valid_jpeg() {
    let image = create_test_rgb_image(24, 18);
    let mut file = read_file(create_test_jpeg(64, 48, 85));
    file.set_thumbnail_image(&image, true).unwrap();

    let mut reread = read_file(write_file(&mut file));
    match reread.thumbnail() {
        Some(Thumbnail::Jpeg(blob)) => assert!(is_valid_jpeg(blob)),
        other => panic!("expected JPEG thumbnail, got {:?}", other),
    }
}

#[test]
fn test_oversized_thumbnail_dropped_nonfatally() {
    // The length tag claims 64 KB: reading succeeds, the blob is dropped,
    // the tags stay readable.
    let mut file = read_file(jpeg_with_exif(&oversized_thumbnail_payload()));
    assert!(file.thumbnail().is_none());
    assert_eq!(
        file.tag_value(&IfdPath::ifd0(), tag::JPEG_INTERCHANGE_FORMAT_LENGTH)
            .and_then(TagValue::u32),
        Some(65536)
    );

    // Writing reconciles the storage tags with the (absent) thumbnail.
    let mut reread = read_file(write_file(&mut file));
    assert!(reread
        .tag_value(&IfdPath::ifd0(), tag::JPEG_INTERCHANGE_FORMAT)
        .is_none());
    assert!(reread
        .tag_value(&IfdPath::ifd0(), tag::JPEG_INTERCHANGE_FORMAT_LENGTH)
        .is_none());
    assert_eq!(
        reread.tag_value(&IfdPath::ifd0(), tag::COMPRESSION),
        Some(&TagValue::short(6))
    );
}

// =============================================================================
// Disk Round Trip
// =============================================================================

#[test]
fn test_save_and_open() {
    let dir = tempfile::tempdir().unwrap();
    let in_path = dir.path().join("in.jpg");
    let out_path = dir.path().join("out.jpg");
    std::fs::write(&in_path, create_test_jpeg(48, 32, 85)).unwrap();

    let mut file = ImageFile::open(&in_path).unwrap();
    file.set_tag_value(&IfdPath::ifd0(), tag::MAKE, TagValue::ascii("Acme"));
    file.save(&out_path).unwrap();

    let mut reread = ImageFile::open(&out_path).unwrap();
    assert_eq!(
        reread
            .tag_value(&IfdPath::ifd0(), tag::MAKE)
            .and_then(TagValue::text),
        Some("Acme".to_string())
    );
    assert!(is_valid_jpeg(&std::fs::read(&out_path).unwrap()));
}
