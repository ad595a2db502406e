//! Multi-value payload parsing, enforcing the "at most one variable-size
//! value, and it must be last" placement invariant (§3/§4.2).

use crate::{
    dtype::{DataType, Value},
    error::CodecError,
};

/// Concatenate the wire encoding of each value, in order.
///
/// Does not itself enforce the placement invariant — callers that build a
/// payload from a fixed command/event signature already know their
/// declared dtypes obey it; [`decode_payload`] is where malicious or
/// malformed wire data is rejected.
#[must_use]
pub fn encode_payload(values: &[Value]) -> Vec<u8> {
    let mut buf = Vec::new();
    for value in values {
        buf.extend(value.encode());
    }
    buf
}

/// Parse `payload` into one value per entry of `expected_types`.
///
/// - An empty `expected_types` requires `payload` to be empty.
/// - Every type before the last must be fixed-size.
/// - The last type may be variable-size, in which case it consumes the
///   remainder of `payload` (which may be empty for `UTF8`/`BLOB`); if it is
///   fixed-size, `payload` must be exactly consumed by it.
///
/// # Errors
///
/// [`CodecError::VariableSizeNotLast`] if a variable-size type appears
/// before the last position. [`CodecError::PayloadTooShort`] /
/// [`CodecError::PayloadTooLong`] if the byte count does not match.
pub fn decode_payload(
    payload: &[u8],
    expected_types: &[DataType],
) -> Result<Vec<Value>, CodecError> {
    if expected_types.is_empty() {
        return if payload.is_empty() { Ok(Vec::new()) } else { Err(CodecError::PayloadTooLong) };
    }

    if expected_types[..expected_types.len() - 1].iter().any(|dtype| dtype.is_variable_size()) {
        return Err(CodecError::VariableSizeNotLast);
    }

    let mut values = Vec::with_capacity(expected_types.len());
    let mut rest = payload;

    for (idx, &dtype) in expected_types.iter().enumerate() {
        let is_last = idx + 1 == expected_types.len();
        let size = match dtype.size() {
            Some(size) => size,
            None => rest.len(), // variable-size, only valid here if `is_last`
        };

        if size > rest.len() {
            return Err(CodecError::PayloadTooShort);
        }

        let (chunk, remainder) = rest.split_at(size);
        values.push(Value::decode(dtype, chunk)?);
        rest = remainder;

        if is_last && dtype.size().is_some() && !rest.is_empty() {
            return Err(CodecError::PayloadTooLong);
        }
    }

    Ok(values)
}

/// Convenience wrapper for the common case of a single expected data type,
/// returning a scalar [`Value`] rather than a one-element `Vec`.
///
/// This is the idiomatic-Rust stand-in for the source implementation's
/// `list`-vs-scalar return based on whether the caller passed a list or a
/// bare `HdcDataType` (see `DESIGN.md`).
pub fn decode_payload_scalar(payload: &[u8], expected_type: DataType) -> Result<Value, CodecError> {
    let mut values = decode_payload(payload, std::slice::from_ref(&expected_type))?;
    Ok(values.remove(0))
}
