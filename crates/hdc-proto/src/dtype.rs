//! The closed set of HDC data-type tags and the tagged value that carries
//! one of them.
//!
//! Tag layout: the upper nibble encodes the category (unsigned/signed
//! integer, float, string, binary, the data-type tag itself), the lower
//! nibble the byte size, with `0x_F` reserved to mean "variable size".

use crate::error::CodecError;

/// One member of the closed HDC data-type set.
///
/// Each variant corresponds to exactly one wire tag (see the associated
/// constants) and one fixed-or-variable byte size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// `UINT8`, 1 byte, little-endian.
    Uint8,
    /// `UINT16`, 2 bytes, little-endian.
    Uint16,
    /// `UINT32`, 4 bytes, little-endian.
    Uint32,
    /// `INT8`, 1 byte, little-endian two's complement.
    Int8,
    /// `INT16`, 2 bytes, little-endian two's complement.
    Int16,
    /// `INT32`, 4 bytes, little-endian two's complement.
    Int32,
    /// `FLOAT`, 4-byte IEEE-754, little-endian.
    Float,
    /// `DOUBLE`, 8-byte IEEE-754, little-endian.
    Double,
    /// `UTF8`, variable size, strict UTF-8.
    Utf8,
    /// `BOOL`, 1 byte, `0` or `1`.
    Bool,
    /// `BLOB`, variable size, opaque bytes.
    Blob,
    /// `DTYPE`, 1 byte, a tag value of this very enum.
    Dtype,
}

impl DataType {
    /// Wire tag for [`Self::Uint8`].
    pub const TAG_UINT8: u8 = 0x01;
    /// Wire tag for [`Self::Uint16`].
    pub const TAG_UINT16: u8 = 0x02;
    /// Wire tag for [`Self::Uint32`].
    pub const TAG_UINT32: u8 = 0x04;
    /// Wire tag for [`Self::Int8`].
    pub const TAG_INT8: u8 = 0x11;
    /// Wire tag for [`Self::Int16`].
    pub const TAG_INT16: u8 = 0x12;
    /// Wire tag for [`Self::Int32`].
    pub const TAG_INT32: u8 = 0x14;
    /// Wire tag for [`Self::Float`].
    pub const TAG_FLOAT: u8 = 0x24;
    /// Wire tag for [`Self::Double`].
    pub const TAG_DOUBLE: u8 = 0x28;
    /// Wire tag for [`Self::Utf8`].
    pub const TAG_UTF8: u8 = 0xAF;
    /// Wire tag for [`Self::Bool`].
    pub const TAG_BOOL: u8 = 0xB1;
    /// Wire tag for [`Self::Blob`].
    pub const TAG_BLOB: u8 = 0xBF;
    /// Wire tag for [`Self::Dtype`].
    pub const TAG_DTYPE: u8 = 0xD1;

    /// Classify a raw tag byte. `None` if the byte is not a defined tag.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            Self::TAG_UINT8 => Some(Self::Uint8),
            Self::TAG_UINT16 => Some(Self::Uint16),
            Self::TAG_UINT32 => Some(Self::Uint32),
            Self::TAG_INT8 => Some(Self::Int8),
            Self::TAG_INT16 => Some(Self::Int16),
            Self::TAG_INT32 => Some(Self::Int32),
            Self::TAG_FLOAT => Some(Self::Float),
            Self::TAG_DOUBLE => Some(Self::Double),
            Self::TAG_UTF8 => Some(Self::Utf8),
            Self::TAG_BOOL => Some(Self::Bool),
            Self::TAG_BLOB => Some(Self::Blob),
            Self::TAG_DTYPE => Some(Self::Dtype),
            _ => None,
        }
    }

    /// The raw wire tag for this data type.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            Self::Uint8 => Self::TAG_UINT8,
            Self::Uint16 => Self::TAG_UINT16,
            Self::Uint32 => Self::TAG_UINT32,
            Self::Int8 => Self::TAG_INT8,
            Self::Int16 => Self::TAG_INT16,
            Self::Int32 => Self::TAG_INT32,
            Self::Float => Self::TAG_FLOAT,
            Self::Double => Self::TAG_DOUBLE,
            Self::Utf8 => Self::TAG_UTF8,
            Self::Bool => Self::TAG_BOOL,
            Self::Blob => Self::TAG_BLOB,
            Self::Dtype => Self::TAG_DTYPE,
        }
    }

    /// Fixed encoded size in bytes, or `None` for the two variable-size
    /// types (`Utf8`, `Blob`).
    #[must_use]
    pub const fn size(self) -> Option<usize> {
        match self {
            Self::Uint8 | Self::Int8 | Self::Bool | Self::Dtype => Some(1),
            Self::Uint16 | Self::Int16 => Some(2),
            Self::Uint32 | Self::Int32 | Self::Float => Some(4),
            Self::Double => Some(8),
            Self::Utf8 | Self::Blob => None,
        }
    }

    /// `true` for [`Self::Utf8`] and [`Self::Blob`].
    #[must_use]
    pub const fn is_variable_size(self) -> bool {
        self.size().is_none()
    }
}

/// A value tagged with the [`DataType`] it was encoded/decoded as.
///
/// This is the sum-type replacement for the source implementation's
/// per-dtype proxy class hierarchy (see `SPEC_FULL.md`): casting safety
/// comes from matching on the variant, not from subclassing.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A `UINT8` value.
    Uint8(u8),
    /// A `UINT16` value.
    Uint16(u16),
    /// A `UINT32` value.
    Uint32(u32),
    /// An `INT8` value.
    Int8(i8),
    /// An `INT16` value.
    Int16(i16),
    /// An `INT32` value.
    Int32(i32),
    /// A `FLOAT` value.
    Float(f32),
    /// A `DOUBLE` value.
    Double(f64),
    /// A `UTF8` value.
    Utf8(String),
    /// A `BOOL` value.
    Bool(bool),
    /// A `BLOB` value.
    Blob(Vec<u8>),
    /// A `DTYPE` value (a tag of this very enum).
    Dtype(DataType),
}

impl Value {
    /// The [`DataType`] this value was constructed as.
    #[must_use]
    pub const fn dtype(&self) -> DataType {
        match self {
            Self::Uint8(_) => DataType::Uint8,
            Self::Uint16(_) => DataType::Uint16,
            Self::Uint32(_) => DataType::Uint32,
            Self::Int8(_) => DataType::Int8,
            Self::Int16(_) => DataType::Int16,
            Self::Int32(_) => DataType::Int32,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
            Self::Utf8(_) => DataType::Utf8,
            Self::Bool(_) => DataType::Bool,
            Self::Blob(_) => DataType::Blob,
            Self::Dtype(_) => DataType::Dtype,
        }
    }

    /// Encode this value to its wire representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Uint8(v) => vec![*v],
            Self::Uint16(v) => v.to_le_bytes().to_vec(),
            Self::Uint32(v) => v.to_le_bytes().to_vec(),
            Self::Int8(v) => vec![v.to_le_bytes()[0]],
            Self::Int16(v) => v.to_le_bytes().to_vec(),
            Self::Int32(v) => v.to_le_bytes().to_vec(),
            Self::Float(v) => v.to_le_bytes().to_vec(),
            Self::Double(v) => v.to_le_bytes().to_vec(),
            Self::Utf8(v) => v.as_bytes().to_vec(),
            Self::Bool(v) => vec![u8::from(*v)],
            Self::Blob(v) => v.clone(),
            Self::Dtype(v) => vec![v.tag()],
        }
    }

    /// Decode `bytes` as a value of `dtype`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::LengthMismatch`] if a fixed-size type did not
    /// receive exactly `dtype.size()` bytes, and
    /// [`CodecError::InvalidEncoding`] for a well-sized but invalid encoding
    /// (non-UTF-8 text, a `BOOL` byte that is neither 0 nor 1, or a `DTYPE`
    /// byte that is not itself a defined tag).
    pub fn decode(dtype: DataType, bytes: &[u8]) -> Result<Self, CodecError> {
        if let Some(expected) = dtype.size() {
            if bytes.len() != expected {
                return Err(CodecError::LengthMismatch { dtype, expected, actual: bytes.len() });
            }
        }

        match dtype {
            DataType::Uint8 => Ok(Self::Uint8(bytes[0])),
            DataType::Uint16 => Ok(Self::Uint16(u16::from_le_bytes([bytes[0], bytes[1]]))),
            DataType::Uint32 => {
                Ok(Self::Uint32(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])))
            },
            DataType::Int8 => Ok(Self::Int8(bytes[0] as i8)),
            DataType::Int16 => Ok(Self::Int16(i16::from_le_bytes([bytes[0], bytes[1]]))),
            DataType::Int32 => {
                Ok(Self::Int32(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])))
            },
            DataType::Float => {
                Ok(Self::Float(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])))
            },
            DataType::Double => {
                let mut arr = [0u8; 8];
                arr.copy_from_slice(bytes);
                Ok(Self::Double(f64::from_le_bytes(arr)))
            },
            DataType::Utf8 => std::str::from_utf8(bytes).map(|s| Self::Utf8(s.to_owned())).map_err(
                |e| CodecError::InvalidEncoding { dtype, reason: e.to_string() },
            ),
            DataType::Bool => match bytes[0] {
                0 => Ok(Self::Bool(false)),
                1 => Ok(Self::Bool(true)),
                other => Err(CodecError::InvalidEncoding {
                    dtype,
                    reason: format!("byte 0x{other:02x} is neither 0 nor 1"),
                }),
            },
            DataType::Blob => Ok(Self::Blob(bytes.to_vec())),
            DataType::Dtype => DataType::from_tag(bytes[0]).map(Self::Dtype).ok_or_else(|| {
                CodecError::InvalidEncoding {
                    dtype,
                    reason: format!("0x{:02x} is not a defined data type tag", bytes[0]),
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn fixed_sizes() {
        assert_eq!(DataType::Uint8.size(), Some(1));
        assert_eq!(DataType::Uint16.size(), Some(2));
        assert_eq!(DataType::Uint32.size(), Some(4));
        assert_eq!(DataType::Double.size(), Some(8));
        assert_eq!(DataType::Utf8.size(), None);
        assert_eq!(DataType::Blob.size(), None);
        assert!(DataType::Utf8.is_variable_size());
        assert!(!DataType::Uint32.is_variable_size());
    }

    #[test]
    fn tag_round_trip_all_defined() {
        for tag in [
            DataType::TAG_UINT8,
            DataType::TAG_UINT16,
            DataType::TAG_UINT32,
            DataType::TAG_INT8,
            DataType::TAG_INT16,
            DataType::TAG_INT32,
            DataType::TAG_FLOAT,
            DataType::TAG_DOUBLE,
            DataType::TAG_UTF8,
            DataType::TAG_BOOL,
            DataType::TAG_BLOB,
            DataType::TAG_DTYPE,
        ] {
            let dt = DataType::from_tag(tag).expect("defined tag should classify");
            assert_eq!(dt.tag(), tag);
        }
    }

    #[test]
    fn undefined_tag_rejected() {
        assert_eq!(DataType::from_tag(0x00), None);
        assert_eq!(DataType::from_tag(0xFF), None);
    }

    #[test]
    fn bool_rejects_non_canonical_byte() {
        let err = Value::decode(DataType::Bool, &[2]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidEncoding { dtype: DataType::Bool, .. }));
    }

    #[test]
    fn utf8_rejects_invalid_bytes() {
        let err = Value::decode(DataType::Utf8, &[0xFF, 0xFE]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidEncoding { dtype: DataType::Utf8, .. }));
    }

    #[test]
    fn dtype_rejects_undefined_inner_tag() {
        let err = Value::decode(DataType::Dtype, &[0x00]).unwrap_err();
        assert!(matches!(err, CodecError::InvalidEncoding { dtype: DataType::Dtype, .. }));
    }

    #[test]
    fn fixed_size_length_mismatch() {
        let err = Value::decode(DataType::Uint32, &[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            CodecError::LengthMismatch { dtype: DataType::Uint32, expected: 4, actual: 3 }
        );
    }

    proptest! {
        #[test]
        fn round_trip_uint8(v: u8) {
            let value = Value::Uint8(v);
            prop_assert_eq!(Value::decode(DataType::Uint8, &value.encode()).unwrap(), value);
        }

        #[test]
        fn round_trip_uint16(v: u16) {
            let value = Value::Uint16(v);
            prop_assert_eq!(Value::decode(DataType::Uint16, &value.encode()).unwrap(), value);
        }

        #[test]
        fn round_trip_uint32(v: u32) {
            let value = Value::Uint32(v);
            prop_assert_eq!(Value::decode(DataType::Uint32, &value.encode()).unwrap(), value);
        }

        #[test]
        fn round_trip_int32(v: i32) {
            let value = Value::Int32(v);
            prop_assert_eq!(Value::decode(DataType::Int32, &value.encode()).unwrap(), value);
        }

        #[test]
        fn round_trip_float(v: f32) {
            let value = Value::Float(v);
            let decoded = Value::decode(DataType::Float, &value.encode()).unwrap();
            match decoded {
                Value::Float(d) => prop_assert!(d.to_bits() == v.to_bits() || (d.is_nan() && v.is_nan())),
                _ => prop_assert!(false, "expected Float"),
            }
        }

        #[test]
        fn round_trip_bool(v: bool) {
            let value = Value::Bool(v);
            prop_assert_eq!(Value::decode(DataType::Bool, &value.encode()).unwrap(), value);
        }

        #[test]
        fn round_trip_utf8(v in ".*") {
            let value = Value::Utf8(v);
            prop_assert_eq!(Value::decode(DataType::Utf8, &value.encode()).unwrap(), value);
        }

        #[test]
        fn round_trip_blob(v: Vec<u8>) {
            let value = Value::Blob(v);
            prop_assert_eq!(Value::decode(DataType::Blob, &value.encode()).unwrap(), value);
        }
    }
}
