//! Errors raised while configuring a [`crate::DeviceRouter`] (not wire-level
//! exceptions — those are [`hdc_core::HdcCmdException`]).

use thiserror::Error;

/// Errors raised by [`crate::DeviceRouter`] configuration methods.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// `max_req_size` was below the protocol floor (§6: "`max_req_size` (u32, ≥5")).
    #[error("max_req_size must be at least 5 bytes, got {0}")]
    MaxReqSizeTooSmall(u32),

    /// A feature with this id is already registered on the router.
    #[error("feature 0x{0:02x} is already registered")]
    DuplicateFeature(u8),

    /// A command was registered for a feature that hasn't been added yet.
    #[error("feature 0x{0:02x} is not registered")]
    UnknownFeature(u8),

    /// A command was registered for an id the feature has no descriptor for.
    ///
    /// Declare the command on the [`hdc_core::Feature`] first via
    /// `register_command`, then wire its behavior here.
    #[error("feature 0x{feature:02x} has no command descriptor for id 0x{command:02x}")]
    UndeclaredCommand {
        /// FeatureID the command was being wired on.
        feature: u8,
        /// The undeclared CommandID.
        command: u8,
    },
}
