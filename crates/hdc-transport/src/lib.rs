//! The [`Transport`] contract consumed by the router (§6), plus concrete
//! transports: serial, TCP socket-server, an in-process mock/loopback pair,
//! and the tunnel adapter (§4.5).
//!
//! None of these transports re-implement framing: byte-stream transports
//! (serial, socket) feed inbound bytes through [`hdc_proto::Packetizer`] and
//! call `on_message` once per assembled message; [`tunnel::TunnelTransport`]
//! rides on a parent router's already-framed message channel.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod mock;
pub mod serial;
pub mod socket;
pub mod tunnel;

pub use error::TransportError;

/// Called once per fully assembled inbound message.
pub type OnMessage = Box<dyn Fn(Vec<u8>) + Send + Sync>;

/// Called exactly once after the last message, when the connection ends.
/// `None` for a clean close; `Some(err)` for a transport-level error.
pub type OnConnectionLost = Box<dyn FnOnce(Option<TransportError>) + Send>;

/// A full-duplex message channel (§6).
///
/// Implementations own a dedicated receiver thread (§5): `connect` starts it
/// and returns immediately; `on_message` and `on_connection_lost` are
/// invoked from that thread. `send_message` may be called concurrently from
/// any thread and must serialize its writes against other sends on the same
/// transport so a multi-packet message is never interleaved with another.
pub trait Transport: Send {
    /// Begin reception. Must invoke `on_message` for each assembled message
    /// and `on_connection_lost` exactly once, after the last message.
    ///
    /// # Errors
    ///
    /// [`TransportError::AlreadyConnected`] if already connected; an I/O or
    /// configuration error if the underlying channel cannot be opened.
    fn connect(
        &mut self,
        on_message: OnMessage,
        on_connection_lost: OnConnectionLost,
    ) -> Result<(), TransportError>;

    /// Send a whole message. Atomic with respect to other sends on the same
    /// transport.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] if not connected; an I/O error if
    /// the write fails.
    fn send_message(&self, message: &[u8]) -> Result<(), TransportError>;

    /// Block until all pending outbound bytes have been written.
    ///
    /// # Errors
    ///
    /// An I/O error if the flush fails.
    fn flush(&self) -> Result<(), TransportError>;

    /// Idempotent. Stops the receiver thread deterministically (within at
    /// most one read-timeout period for byte-stream transports).
    ///
    /// # Errors
    ///
    /// An I/O error if the underlying channel could not be closed cleanly.
    fn close(&mut self) -> Result<(), TransportError>;

    /// Whether [`Self::connect`] has succeeded and [`Self::close`] has not
    /// since been called.
    fn is_connected(&self) -> bool;

    /// The transport's address, in its own URL scheme.
    fn url(&self) -> &str;
}

/// Registers/send on behalf of a custom (tunneled) message type over a
/// parent router's already-connected transport.
///
/// Implemented by `hdc-host`'s and `hdc-device`'s routers, and consumed by
/// [`tunnel::TunnelTransport`] — this is the seam that lets a transport
/// crate depend on "a router" without depending on the host/device crates
/// that define one.
pub trait CustomMessageParent: Send + Sync {
    /// Send `[message_type] ‖ payload` through the parent's transport.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotConnected`] if the parent's transport is not connected.
    fn send_custom_message(&self, message_type: u8, payload: &[u8]) -> Result<(), TransportError>;

    /// Register a handler invoked with the payload of every inbound custom
    /// message of `message_type` (prefix byte already stripped upstream).
    ///
    /// # Errors
    ///
    /// [`TransportError::TunnelIdInUse`] if a handler is already registered
    /// for `message_type`.
    fn register_custom_message_handler(
        &self,
        message_type: u8,
        handler: Box<dyn Fn(&[u8]) + Send + Sync>,
    ) -> Result<(), TransportError>;

    /// Remove a previously registered custom-message handler, if any.
    fn unregister_custom_message_handler(&self, message_type: u8);

    /// Delegate to the parent transport's flush.
    ///
    /// # Errors
    ///
    /// An I/O error if the flush fails.
    fn flush(&self) -> Result<(), TransportError>;
}
