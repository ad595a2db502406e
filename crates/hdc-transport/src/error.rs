//! Transport-level errors (§6, §7 "transport/connection errors").

use thiserror::Error;

/// Errors surfaced by [`crate::Transport`] implementations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// `connect` was called on a transport that is already connected.
    #[error("transport already connected")]
    AlreadyConnected,

    /// An operation that requires a live connection was attempted on a
    /// closed or not-yet-connected transport.
    #[error("transport is not connected")]
    NotConnected,

    /// A transport URL did not parse (e.g. a malformed `socket://host:port`).
    #[error("invalid transport url: {0}")]
    InvalidUrl(String),

    /// The underlying I/O operation failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial port could not be opened or configured.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// A tunnel was constructed with an id outside the custom range.
    #[error("tunnel id 0x{0:02x} must be in the custom range 0x00..=0xEF")]
    TunnelIdReserved(u8),

    /// A tunnel id collided with one already registered on the parent.
    #[error("tunnel id 0x{0:02x} is already registered on the parent transport")]
    TunnelIdInUse(u8),
}
