//! Wire framing, payload codec, and identifier taxonomy for the HDC
//! (Host/Device Communication) protocol.
//!
//! This crate is Sans-IO: it has no notion of threads, sockets, or time. It
//! only transforms bytes into messages ([`packetizer`]), and message
//! payloads into typed values ([`dtype`], [`payload`]). The request/reply
//! routing semantics built on top of these primitives live in `hdc-core`,
//! `hdc-host`, and `hdc-device`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod dtype;
pub mod error;
pub mod ids;
pub mod packetizer;
pub mod payload;

pub use dtype::{DataType, Value};
pub use error::CodecError;
pub use ids::{MessageType, MetaId, ReservedException};
pub use packetizer::Packetizer;
pub use payload::{decode_payload, decode_payload_scalar, encode_payload};
