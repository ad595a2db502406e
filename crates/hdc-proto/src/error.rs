//! Error types for framing and payload codec failures.

use thiserror::Error;

use crate::dtype::DataType;

/// Errors raised while encoding or decoding HDC payload values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A byte did not correspond to any defined [`DataType`] tag.
    #[error("0x{0:02x} is not a defined HDC data type tag")]
    UnknownDataType(u8),

    /// A value was asked to encode itself as a [`DataType`] it cannot represent.
    #[error("value is not representable as {0:?}")]
    TypeMismatch(DataType),

    /// Decoded bytes could not be interpreted as a valid value of the data type.
    #[error("invalid encoding for {dtype:?}: {reason}")]
    InvalidEncoding {
        /// Data type the bytes were decoded against.
        dtype: DataType,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// A fixed-size data type did not receive exactly `size_of(dtype)` bytes.
    #[error("length mismatch for {dtype:?}: expected {expected} bytes, got {actual}")]
    LengthMismatch {
        /// Data type whose fixed size was violated.
        dtype: DataType,
        /// Expected byte count.
        expected: usize,
        /// Bytes actually supplied.
        actual: usize,
    },

    /// A variable-size data type appeared before the last position in a
    /// multi-value payload.
    #[error("variable-size data type must be the last value in a payload")]
    VariableSizeNotLast,

    /// Fewer bytes remained in the payload than a fixed-size value required.
    #[error("payload is shorter than the expected data types require")]
    PayloadTooShort,

    /// Bytes remained in the payload after all expected values were consumed.
    #[error("payload is longer than the expected data types require")]
    PayloadTooLong,
}
