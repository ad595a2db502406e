//! The closed `HdcCmdException` hierarchy: reserved exceptions mandated by
//! the protocol, plus application-defined ones in the custom id range.
//!
//! A descriptor ([`ExceptionDescriptor`]) catalogs what a command *may*
//! raise (id, name, optional doc); an [`HdcCmdException`] is a thrown
//! *instance*, carrying a concrete message.

use hdc_proto::ids::{is_custom, ReservedException};

use crate::error::CoreError;

/// Catalog entry for an exception a command declares it may raise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionDescriptor {
    /// ExceptionID, `0x01..=0xEF` for a custom descriptor.
    pub id: u8,
    /// Identifier-style name, used in IDL and log output.
    pub name: String,
    /// Optional human-readable documentation.
    pub doc: Option<String>,
}

impl ExceptionDescriptor {
    /// Build a descriptor for a custom (application-defined) exception.
    ///
    /// `id` must be in `0x01..=0xEF`; `0x00` is reserved for "no error" and
    /// `0xF0..=0xFF` for the reserved exceptions already covered by
    /// [`ReservedException`].
    #[must_use]
    pub fn custom(id: u8, name: impl Into<String>, doc: Option<String>) -> Self {
        debug_assert!(is_custom(id) && id != 0, "custom exception id must be 0x01..=0xEF");
        Self { id, name: name.into(), doc }
    }
}

/// A thrown HDC command exception: either one of the seven protocol-reserved
/// exceptions, or an application-defined one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HdcCmdException {
    /// One of the protocol-mandated exceptions (`0xF0..=0xFF`).
    Reserved {
        /// Which reserved exception this is.
        exc: ReservedException,
        /// Error text carried in the reply payload (may be empty).
        message: String,
    },
    /// An application-defined exception (`0x01..=0xEF`).
    Custom {
        /// ExceptionID.
        id: u8,
        /// Identifier-style name.
        name: String,
        /// Error text carried in the reply payload (may be empty).
        message: String,
    },
}

impl HdcCmdException {
    /// Build a [`Self::Reserved`] instance.
    #[must_use]
    pub fn reserved(exc: ReservedException, message: impl Into<String>) -> Self {
        Self::Reserved { exc, message: message.into() }
    }

    /// Build a [`Self::Custom`] instance from a catalog descriptor.
    #[must_use]
    pub fn custom(descriptor: &ExceptionDescriptor, message: impl Into<String>) -> Self {
        Self::Custom { id: descriptor.id, name: descriptor.name.clone(), message: message.into() }
    }

    /// `CommandFailed`, the catch-all for a handler error with no declared
    /// exception type (§7, "any other exception becomes `CommandFailed`").
    #[must_use]
    pub fn command_failed(message: impl Into<String>) -> Self {
        Self::reserved(ReservedException::CommandFailed, message)
    }

    /// The wire ExceptionID.
    #[must_use]
    pub fn id(&self) -> u8 {
        match self {
            Self::Reserved { exc, .. } => exc.to_u8(),
            Self::Custom { id, .. } => *id,
        }
    }

    /// The exception's name, as used in IDL and log output.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Reserved { exc, .. } => exc.name(),
            Self::Custom { name, .. } => name,
        }
    }

    /// The error text carried in the reply payload.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Reserved { message, .. } | Self::Custom { message, .. } => message,
        }
    }
}

impl From<CoreError> for HdcCmdException {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::UnknownProperty(_) => {
                Self::reserved(ReservedException::UnknownProperty, err.to_string())
            },
            CoreError::ReadOnlyProperty(_) => {
                Self::reserved(ReservedException::ReadOnlyProperty, err.to_string())
            },
            CoreError::PropertyTypeMismatch(_) => {
                Self::reserved(ReservedException::InvalidArgs, err.to_string())
            },
            CoreError::DuplicateCommand { .. }
            | CoreError::DuplicateEvent { .. }
            | CoreError::DuplicateProperty { .. } => Self::command_failed(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_round_trips_id_and_name() {
        let exc = HdcCmdException::reserved(ReservedException::NotNow, "busy");
        assert_eq!(exc.id(), ReservedException::NOT_NOW);
        assert_eq!(exc.name(), "NotNow");
        assert_eq!(exc.message(), "busy");
    }

    #[test]
    fn custom_carries_descriptor_identity() {
        let descriptor = ExceptionDescriptor::custom(0x01, "OutOfRange", None);
        let exc = HdcCmdException::custom(&descriptor, "value too large");
        assert_eq!(exc.id(), 0x01);
        assert_eq!(exc.name(), "OutOfRange");
    }

    #[test]
    fn core_error_unknown_property_maps_to_reserved_exception() {
        let exc: HdcCmdException = CoreError::UnknownProperty(0x42).into();
        assert_eq!(exc.id(), ReservedException::UNKNOWN_PROPERTY);
    }
}
