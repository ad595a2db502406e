//! Descriptor model for HDC features: commands, events, properties, and the
//! closed exception hierarchy, plus the mandatory members every feature
//! carries (`GetPropertyValue`/`SetPropertyValue`, `Log`/
//! `FeatureStateTransition`, `LogEventThreshold`/`FeatureState`).
//!
//! This crate has no notion of wire dispatch or transports; `hdc-host` and
//! `hdc-device` build the router on top of it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod core_feature;
pub mod descriptor;
pub mod error;
pub mod exception;
pub mod feature;
pub mod log_level;

pub use core_feature::core_feature;
pub use descriptor::{CommandDescriptor, EventDescriptor, PropertyAccess, PropertyDescriptor};
pub use error::CoreError;
pub use exception::{ExceptionDescriptor, HdcCmdException};
pub use feature::Feature;
