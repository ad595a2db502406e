//! Host-role router (§4.3): single-outstanding request/reply correlation,
//! event demultiplexing, and custom-message pass-through, over any
//! `hdc_transport::Transport`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod router;

pub use error::HostError;
pub use router::{CustomHandler, EventHandler, HostRouter};
