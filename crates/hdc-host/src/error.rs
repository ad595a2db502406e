//! Errors surfaced to callers of [`crate::HostRouter`] (§7 "timeouts",
//! "transport/connection errors").

use thiserror::Error;

/// Errors raised by [`crate::HostRouter::send_request_and_get_reply`] and
/// handler registration.
#[derive(Error, Debug)]
pub enum HostError {
    /// A request was already outstanding when another was attempted (§4.3,
    /// §8 "request/reply singularity").
    #[error("a request is already in flight on this transport")]
    RequestInFlight,

    /// No reply arrived within the caller-supplied timeout. Any reply that
    /// arrives afterward is dropped silently.
    #[error("timed out waiting for a reply")]
    Timeout,

    /// The transport reported connection loss while a request was
    /// outstanding.
    #[error("connection lost while waiting for a reply: {0:?}")]
    ConnectionLost(Option<String>),

    /// The underlying transport failed to send the request.
    #[error(transparent)]
    Transport(#[from] hdc_transport::TransportError),
}
