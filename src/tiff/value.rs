//! Tag values and the directory-entry codec.
//!
//! Every IFD entry is 12 bytes on disk:
//!
//! ```text
//! Bytes 0-1:  Tag number
//! Bytes 2-3:  Field type (1-12, see FieldType)
//! Bytes 4-7:  Element count
//! Bytes 8-11: Value or offset
//! ```
//!
//! When the payload (element size × count) fits in 4 bytes it is packed
//! directly into the value field, element by element in the segment's byte
//! order. Larger payloads live in the trailing data area and the value field
//! holds their offset, relative to the TIFF-header origin.
//!
//! RATIONAL and SRATIONAL values are numerator/denominator pairs on disk but
//! plain floating values in memory; the conversion back to a fraction is the
//! continued-fraction search in [`rationalize`].

use std::io::{Read, Seek};

use crate::error::{CannotRationalize, TiffError};
use crate::io::{ByteOrder, ByteStream};

use super::tags::FieldType;

// =============================================================================
// Constants
// =============================================================================

/// Default approximation error accepted when encoding a float as a fraction.
pub const RATIONALIZE_TOLERANCE: f64 = 1.0e-10;

/// Smallest non-zero magnitude [`rationalize`] accepts (exclusive).
const RATIONAL_MIN: f64 = 3.0e-10;

/// Largest magnitude [`rationalize`] accepts (exclusive).
const RATIONAL_MAX: f64 = 4.0e10;

/// Continued-fraction iteration cap. The expansion of an `f64` terminates
/// well before this; hitting the cap means the value is not representable.
const RATIONALIZE_MAX_STEPS: u32 = 64;

// =============================================================================
// DirEntry
// =============================================================================

/// One raw 12-byte directory entry.
///
/// The value field is kept as raw bytes: inline payloads are decoded from it
/// element by element, and offsets are read from it on demand, so no byte-order
/// correction is applied up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    /// Tag number
    pub tag: u16,

    /// Field type, already validated against the twelve known types
    pub field_type: FieldType,

    /// Number of elements
    pub count: u32,

    /// Raw bytes of the value/offset field
    pub value_bytes: [u8; 4],
}

impl DirEntry {
    /// On-disk size of a directory entry.
    pub const SIZE: u64 = 12;

    /// Read one entry at the stream's current position.
    ///
    /// # Errors
    /// `UnknownFieldType` if the type word is outside 1..=12; `Stream` on a
    /// short read.
    pub fn read<S: Read>(stream: &mut ByteStream<S>) -> Result<Self, TiffError> {
        let tag = stream.read_u16()?;
        let raw_type = stream.read_u16()?;
        let field_type = FieldType::from_u16(raw_type)
            .ok_or(TiffError::UnknownFieldType { tag, raw: raw_type })?;
        let count = stream.read_u32()?;

        let mut value_bytes = [0u8; 4];
        stream.read_exact(&mut value_bytes)?;

        Ok(DirEntry {
            tag,
            field_type,
            count,
            value_bytes,
        })
    }

    /// The value field interpreted as an offset in the given byte order.
    #[inline]
    pub fn value_offset(&self, byte_order: ByteOrder) -> u32 {
        byte_order.read_u32(&self.value_bytes)
    }

    /// Whether this entry's payload is packed inline in the value field.
    #[inline]
    pub fn is_inline(&self) -> bool {
        self.field_type.fits_inline(self.count)
    }

    /// Total encoded payload size in bytes.
    #[inline]
    pub fn payload_size(&self) -> u64 {
        self.field_type.size_in_bytes() as u64 * self.count as u64
    }
}

// =============================================================================
// TagValue
// =============================================================================

/// A typed tag payload: one variant per TIFF wire type.
///
/// Wrong-type access is unrepresentable; the typed accessors return `Option`.
/// RATIONAL/SRATIONAL variants hold floating values and are turned back into
/// fractions only at encode time.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Unsigned 8-bit integers
    Byte(Vec<u8>),

    /// Text bytes, held without the trailing NUL (re-appended on encode)
    Ascii(Vec<u8>),

    /// Unsigned 16-bit integers
    Short(Vec<u16>),

    /// Unsigned 32-bit integers
    Long(Vec<u32>),

    /// Unsigned fractions, held as floating values
    Rational(Vec<f64>),

    /// Signed 8-bit integers
    SByte(Vec<i8>),

    /// Untyped byte data
    Undefined(Vec<u8>),

    /// Signed 16-bit integers
    SShort(Vec<i16>),

    /// Signed 32-bit integers
    SLong(Vec<i32>),

    /// Signed fractions, held as floating values
    SRational(Vec<f64>),

    /// 32-bit IEEE floats
    Float(Vec<f32>),

    /// 64-bit IEEE floats
    Double(Vec<f64>),
}

impl TagValue {
    /// A single-element SHORT value.
    pub fn short(value: u16) -> Self {
        TagValue::Short(vec![value])
    }

    /// A single-element LONG value.
    pub fn long(value: u32) -> Self {
        TagValue::Long(vec![value])
    }

    /// A single-element RATIONAL value.
    pub fn rational(value: f64) -> Self {
        TagValue::Rational(vec![value])
    }

    /// A single-element SRATIONAL value.
    pub fn srational(value: f64) -> Self {
        TagValue::SRational(vec![value])
    }

    /// An ASCII value from a string. The NUL terminator is implicit; it is
    /// appended on encode and reflected in [`count`](Self::count).
    pub fn ascii(text: &str) -> Self {
        TagValue::Ascii(text.as_bytes().to_vec())
    }

    /// An UNDEFINED (opaque bytes) value.
    pub fn undefined(data: Vec<u8>) -> Self {
        TagValue::Undefined(data)
    }

    /// The wire type of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            TagValue::Byte(_) => FieldType::Byte,
            TagValue::Ascii(_) => FieldType::Ascii,
            TagValue::Short(_) => FieldType::Short,
            TagValue::Long(_) => FieldType::Long,
            TagValue::Rational(_) => FieldType::Rational,
            TagValue::SByte(_) => FieldType::SByte,
            TagValue::Undefined(_) => FieldType::Undefined,
            TagValue::SShort(_) => FieldType::SShort,
            TagValue::SLong(_) => FieldType::SLong,
            TagValue::SRational(_) => FieldType::SRational,
            TagValue::Float(_) => FieldType::Float,
            TagValue::Double(_) => FieldType::Double,
        }
    }

    /// The on-disk element count. For ASCII this includes the implicit NUL
    /// terminator, so it is one more than the stored text length.
    pub fn count(&self) -> u32 {
        match self {
            TagValue::Ascii(v) => v.len() as u32 + 1,
            TagValue::Byte(v) => v.len() as u32,
            TagValue::Short(v) => v.len() as u32,
            TagValue::Long(v) => v.len() as u32,
            TagValue::Rational(v) => v.len() as u32,
            TagValue::SByte(v) => v.len() as u32,
            TagValue::Undefined(v) => v.len() as u32,
            TagValue::SShort(v) => v.len() as u32,
            TagValue::SLong(v) => v.len() as u32,
            TagValue::SRational(v) => v.len() as u32,
            TagValue::Float(v) => v.len() as u32,
            TagValue::Double(v) => v.len() as u32,
        }
    }

    /// Whether the encoded payload packs into the entry's 4-byte value field.
    #[inline]
    pub fn fits_inline(&self) -> bool {
        self.field_type().fits_inline(self.count())
    }

    /// Integer elements widened to u32. Accepts BYTE, SHORT and LONG storage;
    /// dimension-style tags are written with either width in the wild.
    pub fn u32s(&self) -> Option<Vec<u32>> {
        match self {
            TagValue::Byte(v) => Some(v.iter().map(|&b| b as u32).collect()),
            TagValue::Short(v) => Some(v.iter().map(|&s| s as u32).collect()),
            TagValue::Long(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// First integer element widened to u32.
    pub fn u32(&self) -> Option<u32> {
        match self {
            TagValue::Byte(v) => v.first().map(|&b| b as u32),
            TagValue::Short(v) => v.first().map(|&s| s as u32),
            TagValue::Long(v) => v.first().copied(),
            _ => None,
        }
    }

    /// Floating elements widened to f64 (RATIONAL, SRATIONAL, FLOAT, DOUBLE).
    pub fn floats(&self) -> Option<Vec<f64>> {
        match self {
            TagValue::Rational(v) | TagValue::SRational(v) | TagValue::Double(v) => Some(v.clone()),
            TagValue::Float(v) => Some(v.iter().map(|&f| f as f64).collect()),
            _ => None,
        }
    }

    /// ASCII content as text, lossily converted.
    pub fn text(&self) -> Option<String> {
        match self {
            TagValue::Ascii(v) => Some(String::from_utf8_lossy(v).into_owned()),
            _ => None,
        }
    }

    /// Decode a directory entry's payload into a typed value.
    ///
    /// Inline payloads are taken from the entry's raw value bytes; indirect
    /// payloads are fetched by seeking to `origin + offset`. The stream
    /// position is unspecified afterwards.
    ///
    /// # Errors
    /// - `ZeroCount` for an element count of zero
    /// - `ValueTooLarge` when an indirect payload does not fit in the stream
    /// - `ZeroDenominator` for a rational that cannot be read back (see
    ///   [`decode_rational_pair`] for the asymmetry between the two types)
    /// - `Stream` on short reads
    pub fn decode<S: Read + Seek>(
        stream: &mut ByteStream<S>,
        entry: &DirEntry,
        origin: u64,
    ) -> Result<TagValue, TiffError> {
        if entry.count == 0 {
            return Err(TiffError::ZeroCount { tag: entry.tag });
        }

        let byte_order = stream.byte_order();
        let size = entry.payload_size();

        if entry.is_inline() {
            return Self::from_bytes(
                &entry.value_bytes[..size as usize],
                entry.field_type,
                byte_order,
                entry.tag,
            );
        }

        let offset = entry.value_offset(byte_order) as u64;
        if origin + offset + size > stream.len()? {
            return Err(TiffError::ValueTooLarge {
                tag: entry.tag,
                bytes: size,
            });
        }

        stream.seek_to(origin + offset)?;
        let bytes = stream.read_vec(size as usize)?;
        Self::from_bytes(&bytes, entry.field_type, byte_order, entry.tag)
    }

    /// Decode a payload slice element by element in the given byte order.
    fn from_bytes(
        bytes: &[u8],
        field_type: FieldType,
        byte_order: ByteOrder,
        tag: u16,
    ) -> Result<TagValue, TiffError> {
        let value = match field_type {
            FieldType::Byte => TagValue::Byte(bytes.to_vec()),
            FieldType::Undefined => TagValue::Undefined(bytes.to_vec()),
            FieldType::SByte => TagValue::SByte(bytes.iter().map(|&b| b as i8).collect()),
            FieldType::Ascii => TagValue::Ascii(strip_one_nul(bytes)),
            FieldType::Short => TagValue::Short(
                bytes
                    .chunks_exact(2)
                    .map(|c| byte_order.read_u16(c))
                    .collect(),
            ),
            FieldType::SShort => TagValue::SShort(
                bytes
                    .chunks_exact(2)
                    .map(|c| byte_order.read_u16(c) as i16)
                    .collect(),
            ),
            FieldType::Long => TagValue::Long(
                bytes
                    .chunks_exact(4)
                    .map(|c| byte_order.read_u32(c))
                    .collect(),
            ),
            FieldType::SLong => TagValue::SLong(
                bytes
                    .chunks_exact(4)
                    .map(|c| byte_order.read_u32(c) as i32)
                    .collect(),
            ),
            FieldType::Float => TagValue::Float(
                bytes
                    .chunks_exact(4)
                    .map(|c| f32::from_bits(byte_order.read_u32(c)))
                    .collect(),
            ),
            FieldType::Double => TagValue::Double(
                bytes
                    .chunks_exact(8)
                    .map(|c| f64::from_bits(byte_order.read_u64(c)))
                    .collect(),
            ),
            FieldType::Rational => {
                let mut values = Vec::with_capacity(bytes.len() / 8);
                for pair in bytes.chunks_exact(8) {
                    let num = byte_order.read_u32(&pair[..4]);
                    let den = byte_order.read_u32(&pair[4..]);
                    values.push(decode_rational_pair(num, den, tag)?);
                }
                TagValue::Rational(values)
            }
            FieldType::SRational => {
                let mut values = Vec::with_capacity(bytes.len() / 8);
                for pair in bytes.chunks_exact(8) {
                    let num = byte_order.read_u32(&pair[..4]) as i32;
                    let den = byte_order.read_u32(&pair[4..]) as i32;
                    if den == 0 {
                        return Err(TiffError::ZeroDenominator { tag });
                    }
                    values.push(num as f64 / den as f64);
                }
                TagValue::SRational(values)
            }
        };
        Ok(value)
    }

    /// Encode the payload in the given byte order.
    ///
    /// The returned buffer is exactly `count × element size` bytes. The caller
    /// decides whether it packs into an entry's value field or goes to the
    /// trailing data area.
    ///
    /// # Errors
    /// `CannotRationalize` when a RATIONAL/SRATIONAL element has no fraction
    /// representation within the default tolerance.
    pub fn to_bytes(&self, byte_order: ByteOrder) -> Result<Vec<u8>, CannotRationalize> {
        let mut out = Vec::with_capacity(
            self.field_type().size_in_bytes() as usize * self.count() as usize,
        );
        match self {
            TagValue::Byte(v) | TagValue::Undefined(v) => out.extend_from_slice(v),
            TagValue::SByte(v) => out.extend(v.iter().map(|&b| b as u8)),
            TagValue::Ascii(v) => {
                out.extend_from_slice(v);
                out.push(0);
            }
            TagValue::Short(v) => {
                for &s in v {
                    out.extend_from_slice(&byte_order.u16_bytes(s));
                }
            }
            TagValue::SShort(v) => {
                for &s in v {
                    out.extend_from_slice(&byte_order.u16_bytes(s as u16));
                }
            }
            TagValue::Long(v) => {
                for &l in v {
                    out.extend_from_slice(&byte_order.u32_bytes(l));
                }
            }
            TagValue::SLong(v) => {
                for &l in v {
                    out.extend_from_slice(&byte_order.u32_bytes(l as u32));
                }
            }
            TagValue::Float(v) => {
                for &f in v {
                    out.extend_from_slice(&byte_order.u32_bytes(f.to_bits()));
                }
            }
            TagValue::Double(v) => {
                for &f in v {
                    out.extend_from_slice(&byte_order.u64_bytes(f.to_bits()));
                }
            }
            TagValue::Rational(v) => {
                for &f in v {
                    let (num, den) = rationalize(f, RATIONALIZE_TOLERANCE)?;
                    out.extend_from_slice(&byte_order.u32_bytes(num));
                    out.extend_from_slice(&byte_order.u32_bytes(den));
                }
            }
            TagValue::SRational(v) => {
                for &f in v {
                    let (num, den) = rationalize_signed(f, RATIONALIZE_TOLERANCE)?;
                    out.extend_from_slice(&byte_order.u32_bytes(num as u32));
                    out.extend_from_slice(&byte_order.u32_bytes(den as u32));
                }
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for TagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagValue::Ascii(_) => write!(f, "\"{}\"", self.text().unwrap_or_default()),
            TagValue::Byte(v) => write_list(f, v),
            TagValue::Short(v) => write_list(f, v),
            TagValue::Long(v) => write_list(f, v),
            TagValue::SByte(v) => write_list(f, v),
            TagValue::SShort(v) => write_list(f, v),
            TagValue::SLong(v) => write_list(f, v),
            TagValue::Rational(v) | TagValue::SRational(v) | TagValue::Double(v) => {
                write_list(f, v)
            }
            TagValue::Float(v) => write_list(f, v),
            TagValue::Undefined(v) => write!(f, "({} bytes)", v.len()),
        }
    }
}

/// At most this many elements are printed before eliding the rest.
const DISPLAY_LIMIT: usize = 8;

fn write_list<T: std::fmt::Display>(f: &mut std::fmt::Formatter<'_>, v: &[T]) -> std::fmt::Result {
    for (i, item) in v.iter().take(DISPLAY_LIMIT).enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    if v.len() > DISPLAY_LIMIT {
        write!(f, ", … ({} total)", v.len())?;
    }
    Ok(())
}

/// Drop exactly one trailing NUL if present.
///
/// A payload without a terminator is not an error: all its bytes are data and
/// the logical count grows by one when the value is encoded again.
fn strip_one_nul(bytes: &[u8]) -> Vec<u8> {
    match bytes.split_last() {
        Some((0, rest)) => rest.to_vec(),
        _ => bytes.to_vec(),
    }
}

/// Read back one RATIONAL pair.
///
/// A zero numerator reads as 0.0 even when the denominator is also zero
/// (files in the wild carry 0/0 for "unset"); a zero denominator under a
/// non-zero numerator is unrepresentable and fails.
fn decode_rational_pair(num: u32, den: u32, tag: u16) -> Result<f64, TiffError> {
    if num == 0 {
        Ok(0.0)
    } else if den == 0 {
        Err(TiffError::ZeroDenominator { tag })
    } else {
        Ok(num as f64 / den as f64)
    }
}

// =============================================================================
// Rationalization
// =============================================================================

/// Convert a floating value to a (numerator, denominator) pair by walking
/// its continued-fraction convergents until one lands within `tolerance`.
///
/// `0.0` maps straight to `0/1`. Everything else must be positive with a
/// magnitude inside (3e-10, 4e10); values outside, negative values, and a
/// negative tolerance fail with [`CannotRationalize`]. A convergent that no
/// longer fits in u32 also fails: the value has no acceptable encoding and
/// writing an approximate zero instead would corrupt the tag.
pub fn rationalize(value: f64, tolerance: f64) -> Result<(u32, u32), CannotRationalize> {
    if tolerance < 0.0 {
        return Err(CannotRationalize { value });
    }
    if value == 0.0 {
        return Ok((0, 1));
    }
    if value < 0.0 || value <= RATIONAL_MIN || value >= RATIONAL_MAX {
        return Err(CannotRationalize { value });
    }

    // Convergents p/q computed in f64; q starts at 1 and only grows.
    let mut rest = value;
    let mut term = rest.floor();
    let mut p_prev = 1.0f64;
    let mut q_prev = 0.0f64;
    let mut p = term;
    let mut q = 1.0f64;

    for _ in 0..RATIONALIZE_MAX_STEPS {
        if p > u32::MAX as f64 || q > u32::MAX as f64 {
            return Err(CannotRationalize { value });
        }
        if (value - p / q).abs() <= tolerance {
            return Ok((p as u32, q as u32));
        }

        let frac = rest - term;
        if frac <= 0.0 {
            break;
        }
        rest = 1.0 / frac;
        term = rest.floor();

        let p_next = term * p + p_prev;
        let q_next = term * q + q_prev;
        p_prev = p;
        q_prev = q;
        p = p_next;
        q = q_next;
    }

    if p <= u32::MAX as f64 && q <= u32::MAX as f64 && (value - p / q).abs() <= tolerance {
        Ok((p as u32, q as u32))
    } else {
        Err(CannotRationalize { value })
    }
}

/// Signed variant: strip the sign, rationalize the magnitude, reapply the
/// sign to the numerator. Both components must additionally fit in i32.
pub fn rationalize_signed(value: f64, tolerance: f64) -> Result<(i32, i32), CannotRationalize> {
    let (num, den) =
        rationalize(value.abs(), tolerance).map_err(|_| CannotRationalize { value })?;
    if num > i32::MAX as u32 || den > i32::MAX as u32 {
        return Err(CannotRationalize { value });
    }
    let num = num as i32;
    Ok(if value < 0.0 {
        (-num, den as i32)
    } else {
        (num, den as i32)
    })
}

// =============================================================================
// Tests
// =============================================================================
