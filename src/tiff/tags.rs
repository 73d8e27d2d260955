//! TIFF tag and field type definitions.
//!
//! This module defines the vocabulary for the directory engine:
//! - The twelve field types that determine how tag values are encoded
//! - Well-known tag numbers (tags are open-world; unknown numbers are carried
//!   through untouched, so tags are plain `u16` rather than a closed enum)
//! - The configurable set of tags recognized as sub-IFD pointers

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
///
/// Each field type has a fixed element size, which drives:
/// - The inline-vs-offset storage decision for an IFD entry
/// - How arrays of values are read and byte-order-corrected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer (1 byte)
    Byte = 1,

    /// 8-bit bytes with a NUL-terminated final byte (1 byte)
    Ascii = 2,

    /// Unsigned 16-bit integer (2 bytes)
    Short = 3,

    /// Unsigned 32-bit integer (4 bytes)
    Long = 4,

    /// Unsigned fraction: two LONGs, numerator then denominator (8 bytes)
    Rational = 5,

    /// Signed 8-bit integer (1 byte)
    SByte = 6,

    /// Untyped byte data (1 byte per element)
    Undefined = 7,

    /// Signed 16-bit integer (2 bytes)
    SShort = 8,

    /// Signed 32-bit integer (4 bytes)
    SLong = 9,

    /// Signed fraction: two SLONGs, numerator then denominator (8 bytes)
    SRational = 10,

    /// 32-bit IEEE floating point (4 bytes)
    Float = 11,

    /// 64-bit IEEE floating point (8 bytes)
    Double = 12,
}

impl FieldType {
    /// Maximum bytes that can be stored inline in an IFD entry's value field.
    pub const INLINE_THRESHOLD: u32 = 4;

    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> u32 {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double => 8,
        }
    }

    /// Create a FieldType from its numeric value.
    ///
    /// Returns `None` for values outside 1..=12; the caller decides whether
    /// that is an error or a tag to skip.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            _ => None,
        }
    }

    /// Check whether `count` values of this type pack into the entry's
    /// 4-byte value field instead of the trailing data area.
    #[inline]
    pub fn fits_inline(self, count: u32) -> bool {
        // count * size cannot overflow: size <= 8
        self.size_in_bytes() as u64 * count as u64 <= Self::INLINE_THRESHOLD as u64
    }

    /// Short display name, using TIFF 6.0 vocabulary.
    pub const fn name(self) -> &'static str {
        match self {
            FieldType::Byte => "BYTE",
            FieldType::Ascii => "ASCII",
            FieldType::Short => "SHORT",
            FieldType::Long => "LONG",
            FieldType::Rational => "RATIONAL",
            FieldType::SByte => "SBYTE",
            FieldType::Undefined => "UNDEFINED",
            FieldType::SShort => "SSHORT",
            FieldType::SLong => "SLONG",
            FieldType::SRational => "SRATIONAL",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
        }
    }
}

// =============================================================================
// Well-Known Tags
// =============================================================================

/// Well-known TIFF/EXIF tag numbers.
///
/// Only the tags the engine itself consults, plus the common EXIF tags worth
/// naming in listings. Any other number is still a perfectly valid tag.
pub mod tag {
    /// Image width in pixels
    pub const IMAGE_WIDTH: u16 = 256;
    /// Image height in pixels
    pub const IMAGE_LENGTH: u16 = 257;
    /// Bits per channel
    pub const BITS_PER_SAMPLE: u16 = 258;
    /// Compression scheme (1 = none, 6 = JPEG)
    pub const COMPRESSION: u16 = 259;
    /// Photometric interpretation
    pub const PHOTOMETRIC_INTERPRETATION: u16 = 262;
    /// Description of the image
    pub const IMAGE_DESCRIPTION: u16 = 270;
    /// Camera manufacturer
    pub const MAKE: u16 = 271;
    /// Camera model
    pub const MODEL: u16 = 272;
    /// Byte offsets of the image strips
    pub const STRIP_OFFSETS: u16 = 273;
    /// Image orientation
    pub const ORIENTATION: u16 = 274;
    /// Channels per pixel
    pub const SAMPLES_PER_PIXEL: u16 = 277;
    /// Rows covered by each strip
    pub const ROWS_PER_STRIP: u16 = 278;
    /// Byte counts of the image strips
    pub const STRIP_BYTE_COUNTS: u16 = 279;
    /// Pixels per resolution unit, horizontal
    pub const X_RESOLUTION: u16 = 282;
    /// Pixels per resolution unit, vertical
    pub const Y_RESOLUTION: u16 = 283;
    /// Chunky vs planar sample layout
    pub const PLANAR_CONFIGURATION: u16 = 284;
    /// Unit for the resolution tags
    pub const RESOLUTION_UNIT: u16 = 296;
    /// Software that produced the image
    pub const SOFTWARE: u16 = 305;
    /// File change date and time
    pub const DATE_TIME: u16 = 306;
    /// Image author
    pub const ARTIST: u16 = 315;
    /// Legacy sub-IFD pointer array
    pub const SUB_IFDS: u16 = 330;
    /// Offset of the embedded JPEG thumbnail stream
    pub const JPEG_INTERCHANGE_FORMAT: u16 = 513;
    /// Length of the embedded JPEG thumbnail stream
    pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 514;
    /// RGB to YCbCr transform coefficients
    pub const YCBCR_COEFFICIENTS: u16 = 529;
    /// YCbCr subsampling factors
    pub const YCBCR_SUB_SAMPLING: u16 = 530;
    /// YCbCr sample positioning
    pub const YCBCR_POSITIONING: u16 = 531;
    /// Copyright notice
    pub const COPYRIGHT: u16 = 33432;
    /// Exposure time in seconds
    pub const EXPOSURE_TIME: u16 = 33434;
    /// Lens F-number
    pub const F_NUMBER: u16 = 33437;
    /// Pointer to the EXIF-specific IFD
    pub const EXIF_IFD_POINTER: u16 = 34665;
    /// Pointer to the GPS IFD
    pub const GPS_IFD_POINTER: u16 = 34853;
    /// ISO speed ratings
    pub const ISO_SPEED_RATINGS: u16 = 34855;
    /// EXIF version (UNDEFINED, 4 bytes)
    pub const EXIF_VERSION: u16 = 36864;
    /// Original capture date and time
    pub const DATE_TIME_ORIGINAL: u16 = 36867;
    /// Digitization date and time
    pub const DATE_TIME_DIGITIZED: u16 = 36868;
    /// Shutter speed (APEX)
    pub const SHUTTER_SPEED_VALUE: u16 = 37377;
    /// Aperture (APEX)
    pub const APERTURE_VALUE: u16 = 37378;
    /// Flash status
    pub const FLASH: u16 = 37385;
    /// Lens focal length in millimeters
    pub const FOCAL_LENGTH: u16 = 37386;
    /// Opaque manufacturer data
    pub const MAKER_NOTE: u16 = 37500;
    /// User comment
    pub const USER_COMMENT: u16 = 37510;
    /// FlashPix version
    pub const FLASHPIX_VERSION: u16 = 40960;
    /// Color space
    pub const COLOR_SPACE: u16 = 40961;
    /// Valid image width recorded by the camera
    pub const PIXEL_X_DIMENSION: u16 = 40962;
    /// Valid image height recorded by the camera
    pub const PIXEL_Y_DIMENSION: u16 = 40963;
    /// Pointer to the interoperability IFD
    pub const INTEROP_IFD_POINTER: u16 = 40965;
    /// Vendor sub-IFD: special effects
    pub const SPECIAL_EFFECTS_IFD: u16 = 50030;
    /// Vendor sub-IFD: borders
    pub const BORDERS_IFD: u16 = 50031;
    /// Vendor sub-IFD: face detection info
    pub const FACES_INFO_IFD: u16 = 50843;
}

/// Compression tag value for uncompressed strip data
pub const COMPRESSION_NONE: u16 = 1;

/// Compression tag value for an embedded JPEG stream
pub const COMPRESSION_JPEG: u16 = 6;

/// Symbolic name for a well-known tag number, for listings and logs.
pub fn tag_name(tag: u16) -> Option<&'static str> {
    let name = match tag {
        tag::IMAGE_WIDTH => "ImageWidth",
        tag::IMAGE_LENGTH => "ImageLength",
        tag::BITS_PER_SAMPLE => "BitsPerSample",
        tag::COMPRESSION => "Compression",
        tag::PHOTOMETRIC_INTERPRETATION => "PhotometricInterpretation",
        tag::IMAGE_DESCRIPTION => "ImageDescription",
        tag::MAKE => "Make",
        tag::MODEL => "Model",
        tag::STRIP_OFFSETS => "StripOffsets",
        tag::ORIENTATION => "Orientation",
        tag::SAMPLES_PER_PIXEL => "SamplesPerPixel",
        tag::ROWS_PER_STRIP => "RowsPerStrip",
        tag::STRIP_BYTE_COUNTS => "StripByteCounts",
        tag::X_RESOLUTION => "XResolution",
        tag::Y_RESOLUTION => "YResolution",
        tag::PLANAR_CONFIGURATION => "PlanarConfiguration",
        tag::RESOLUTION_UNIT => "ResolutionUnit",
        tag::SOFTWARE => "Software",
        tag::DATE_TIME => "DateTime",
        tag::ARTIST => "Artist",
        tag::SUB_IFDS => "SubIFDs",
        tag::JPEG_INTERCHANGE_FORMAT => "JPEGInterchangeFormat",
        tag::JPEG_INTERCHANGE_FORMAT_LENGTH => "JPEGInterchangeFormatLength",
        tag::YCBCR_COEFFICIENTS => "YCbCrCoefficients",
        tag::YCBCR_SUB_SAMPLING => "YCbCrSubSampling",
        tag::YCBCR_POSITIONING => "YCbCrPositioning",
        tag::COPYRIGHT => "Copyright",
        tag::EXPOSURE_TIME => "ExposureTime",
        tag::F_NUMBER => "FNumber",
        tag::EXIF_IFD_POINTER => "ExifIFDPointer",
        tag::GPS_IFD_POINTER => "GPSInfoIFDPointer",
        tag::ISO_SPEED_RATINGS => "ISOSpeedRatings",
        tag::EXIF_VERSION => "ExifVersion",
        tag::DATE_TIME_ORIGINAL => "DateTimeOriginal",
        tag::DATE_TIME_DIGITIZED => "DateTimeDigitized",
        tag::SHUTTER_SPEED_VALUE => "ShutterSpeedValue",
        tag::APERTURE_VALUE => "ApertureValue",
        tag::FLASH => "Flash",
        tag::FOCAL_LENGTH => "FocalLength",
        tag::MAKER_NOTE => "MakerNote",
        tag::USER_COMMENT => "UserComment",
        tag::FLASHPIX_VERSION => "FlashpixVersion",
        tag::COLOR_SPACE => "ColorSpace",
        tag::PIXEL_X_DIMENSION => "PixelXDimension",
        tag::PIXEL_Y_DIMENSION => "PixelYDimension",
        tag::INTEROP_IFD_POINTER => "InteropIFDPointer",
        tag::SPECIAL_EFFECTS_IFD => "SpecialEffectsIFD",
        tag::BORDERS_IFD => "BordersIFD",
        tag::FACES_INFO_IFD => "FacesInfoIFD",
        _ => return None,
    };
    Some(name)
}

// =============================================================================
// Sub-IFD Registry
// =============================================================================

/// The set of tag numbers recognized as sub-IFD pointers.
///
/// When the directory reader meets one of these tags, its value is treated as
/// one or more offsets to child directories and the children are parsed
/// recursively. The set ships with the well-known pointers pre-populated and
/// can be extended for application-specific trees; it is plain configuration,
/// passed to the reader, with no global state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubIfdTags {
    tags: Vec<u16>,
}

impl SubIfdTags {
    /// The built-in pointer tags: legacy SubIFDs, EXIF, GPS, interoperability,
    /// and the vendor trees for special effects, borders and face info.
    pub const WELL_KNOWN: [u16; 7] = [
        tag::SUB_IFDS,
        tag::EXIF_IFD_POINTER,
        tag::GPS_IFD_POINTER,
        tag::INTEROP_IFD_POINTER,
        tag::SPECIAL_EFFECTS_IFD,
        tag::BORDERS_IFD,
        tag::FACES_INFO_IFD,
    ];

    /// An empty registry that recognizes no pointer tags.
    pub fn empty() -> Self {
        Self { tags: Vec::new() }
    }

    /// Whether `tag` is recognized as a sub-IFD pointer.
    #[inline]
    pub fn contains(&self, tag: u16) -> bool {
        self.tags.contains(&tag)
    }

    /// Add an application-specific pointer tag. Idempotent.
    pub fn register(&mut self, tag: u16) {
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// All registered pointer tags.
    pub fn tags(&self) -> &[u16] {
        &self.tags
    }
}

impl Default for SubIfdTags {
    fn default() -> Self {
        Self {
            tags: Self::WELL_KNOWN.to_vec(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
