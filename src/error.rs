use thiserror::Error;

/// Errors from the underlying byte stream
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// OS-level I/O failure, message carried as text so the error stays cheap to clone
    #[error("I/O error: {0}")]
    Io(String),

    /// Fewer bytes available than requested
    #[error("Unexpected end of stream: wanted {wanted} bytes")]
    UnexpectedEof { wanted: usize },

    /// Seek target before the start of the stream
    #[error("Seek out of bounds: {0}")]
    SeekOutOfBounds(i64),
}

impl From<std::io::Error> for StreamError {
    fn from(err: std::io::Error) -> Self {
        StreamError::Io(err.to_string())
    }
}

/// A floating value has no numerator/denominator representation within tolerance.
///
/// Raised for negative values, magnitudes outside (3e-10, 4e10) other than
/// exactly zero, and negative tolerances.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Cannot rationalize {value}")]
pub struct CannotRationalize {
    pub value: f64,
}

/// Errors from parsing or serializing TIFF structures (headers, directories, tag values)
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading or writing the stream
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42, got {0}")]
    InvalidVersion(u16),

    /// Directory entry count over the sanity ceiling
    #[error("Directory entry count {count} exceeds ceiling {max}")]
    EntryCountTooLarge { count: u16, max: u16 },

    /// Field type outside the twelve defined TIFF types
    #[error("Tag {tag}: unknown field type {raw}")]
    UnknownFieldType { tag: u16, raw: u16 },

    /// Directory entry with an element count of zero
    #[error("Tag {tag}: element count must be at least 1")]
    ZeroCount { tag: u16 },

    /// Value data larger than the stream that is supposed to contain it
    #[error("Tag {tag}: value of {bytes} bytes does not fit in the segment")]
    ValueTooLarge { tag: u16, bytes: u64 },

    /// RATIONAL with a zero denominator and a non-zero numerator
    #[error("Tag {tag}: rational with zero denominator")]
    ZeroDenominator { tag: u16 },

    /// Two directories claim the same offset; the chain loops or overlaps
    #[error("Duplicate IFD offset {0}")]
    DuplicateIfdOffset(u32),

    /// A floating tag value could not be encoded as a rational
    #[error(transparent)]
    Rationalize(#[from] CannotRationalize),
}

/// Errors from whole-file JPEG operations (the `ImageFile` façade and app segments)
#[derive(Debug, Clone, Error)]
pub enum FileError {
    /// I/O error while reading or writing the stream
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Error inside a TIFF-based application segment
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// File does not start with an SOI marker
    #[error("Not a JPEG file: missing SOI marker")]
    MissingSoi,

    /// Marker segment with a length field below the 2 bytes it must cover
    #[error("Segment 0x{marker:04X}: invalid length field {len}")]
    BadSegmentLength { marker: u16, len: u16 },

    /// No pixel stream was captured during read, so there is nothing to write
    #[error("No image data to write after the metadata segments")]
    NoImageData,

    /// Serialized segment would not fit the 16-bit JPEG length field
    #[error("Segment data length {len} exceeds the 65535-byte JPEG segment limit")]
    SegmentOverflow { len: u64 },

    /// Thumbnail material outside the embeddable size range
    #[error("Thumbnail size {size} outside the embeddable range 1..={max} bytes")]
    ThumbnailTooLarge { size: usize, max: usize },

    /// JPEG pixel codec failure while encoding or decoding thumbnail pixels
    #[error("Image codec error: {0}")]
    Image(String),
}
