//! Fuzz target for the payload codec (`decode_payload`, `Value::decode`).
//!
//! Drives `decode_payload` with an arbitrary declared type signature against
//! arbitrary payload bytes — including signatures that violate the
//! "variable-size must be last" placement invariant, which must be rejected
//! rather than panic or read out of bounds. A successful decode must
//! re-encode to a payload `decode_payload` accepts again.

#![no_main]

use arbitrary::Arbitrary;
use hdc_proto::{
    dtype::DataType,
    payload::{decode_payload, encode_payload},
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Copy, Arbitrary)]
enum FuzzDataType {
    Uint8,
    Uint16,
    Uint32,
    Int8,
    Int16,
    Int32,
    Float,
    Double,
    Utf8,
    Bool,
    Blob,
    Dtype,
}

impl From<FuzzDataType> for DataType {
    fn from(value: FuzzDataType) -> Self {
        match value {
            FuzzDataType::Uint8 => Self::Uint8,
            FuzzDataType::Uint16 => Self::Uint16,
            FuzzDataType::Uint32 => Self::Uint32,
            FuzzDataType::Int8 => Self::Int8,
            FuzzDataType::Int16 => Self::Int16,
            FuzzDataType::Int32 => Self::Int32,
            FuzzDataType::Float => Self::Float,
            FuzzDataType::Double => Self::Double,
            FuzzDataType::Utf8 => Self::Utf8,
            FuzzDataType::Bool => Self::Bool,
            FuzzDataType::Blob => Self::Blob,
            FuzzDataType::Dtype => Self::Dtype,
        }
    }
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    expected_types: Vec<FuzzDataType>,
    payload: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let expected_types: Vec<DataType> = input.expected_types.into_iter().map(DataType::from).collect();

    if let Ok(values) = decode_payload(&input.payload, &expected_types) {
        let re_encoded = encode_payload(&values);
        let re_decoded =
            decode_payload(&re_encoded, &expected_types).expect("a value this codec produced must decode again");
        assert_eq!(re_decoded, values);
    }
});
