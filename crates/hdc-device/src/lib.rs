//! Device-role router (§4.4): a single-pending-request gate, command
//! dispatch with exception-to-reply translation, inline `META`/`ECHO`
//! handling, and the event-emission/log-suppression/`FeatureStateTransition`
//! service, layered on top of any `hdc_transport::Transport`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod idl;
pub mod router;

pub use error::DeviceError;
pub use router::{CustomHandler, DeviceRouter, DEFAULT_MAX_REQ_SIZE, MIN_MAX_REQ_SIZE};
