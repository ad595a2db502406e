//! Errors raised by the feature/descriptor model.

use thiserror::Error;

/// Errors raised while building or operating on a [`crate::feature::Feature`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A command with this id was already registered on the feature.
    #[error("feature 0x{feature:02x}: duplicate command id 0x{id:02x}")]
    DuplicateCommand {
        /// FeatureID the command was being registered on.
        feature: u8,
        /// The colliding CommandID.
        id: u8,
    },

    /// An event with this id was already registered on the feature.
    #[error("feature 0x{feature:02x}: duplicate event id 0x{id:02x}")]
    DuplicateEvent {
        /// FeatureID the event was being registered on.
        feature: u8,
        /// The colliding EventID.
        id: u8,
    },

    /// A property with this id was already registered on the feature.
    #[error("feature 0x{feature:02x}: duplicate property id 0x{id:02x}")]
    DuplicateProperty {
        /// FeatureID the property was being registered on.
        feature: u8,
        /// The colliding PropertyID.
        id: u8,
    },

    /// `GetPropertyValue`/`SetPropertyValue` addressed an id with no registered property.
    #[error("unknown property id 0x{0:02x}")]
    UnknownProperty(u8),

    /// `SetPropertyValue` addressed a property that was registered without a setter.
    #[error("property 0x{0:02x} is read-only")]
    ReadOnlyProperty(u8),

    /// A value did not match the property's declared data type.
    #[error("value does not match the declared data type of property 0x{0:02x}")]
    PropertyTypeMismatch(u8),
}
