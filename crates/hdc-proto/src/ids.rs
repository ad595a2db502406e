//! Identifier taxonomy: message types and the reserved/custom ranges that
//! apply within every per-scope UINT8 identifier namespace (features,
//! commands, events, properties, exceptions, meta-ids).
//!
//! Within each namespace, `0xF0..=0xFF` is reserved for protocol-mandated
//! members; `0x00..=0xEF` is available for application-defined ones.

/// First identifier value of the reserved range, in every namespace.
pub const RESERVED_RANGE_START: u8 = 0xF0;

/// Returns `true` if `id` falls in the protocol-reserved range `0xF0..=0xFF`.
#[must_use]
pub const fn is_reserved(id: u8) -> bool {
    id >= RESERVED_RANGE_START
}

/// Returns `true` if `id` falls in the application-defined range `0x00..=0xEF`.
#[must_use]
pub const fn is_custom(id: u8) -> bool {
    !is_reserved(id)
}

/// The byte-0 discriminant of an HDC message.
///
/// `META`, `ECHO`, `COMMAND` and `EVENT` occupy the reserved upper range.
/// Every other value (`0x00..=0xEF`) is a custom message type, exempt from
/// the request/reply gate (§4.3/§4.4) and typically used for tunneling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Protocol introspection (`META`, 0xF0).
    Meta,
    /// Opaque loopback (`ECHO`, 0xF1).
    Echo,
    /// Command request/reply (`COMMAND`, 0xF2).
    Command,
    /// Asynchronous device-to-host notification (`EVENT`, 0xF3).
    Event,
    /// Application-defined message, bypassing the request/reply gate.
    Custom(u8),
}

impl MessageType {
    /// `META` byte-0 value.
    pub const META: u8 = 0xF0;
    /// `ECHO` byte-0 value.
    pub const ECHO: u8 = 0xF1;
    /// `COMMAND` byte-0 value.
    pub const COMMAND: u8 = 0xF2;
    /// `EVENT` byte-0 value.
    pub const EVENT: u8 = 0xF3;

    /// Classify a raw byte-0 value.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Self {
        match byte {
            Self::META => Self::Meta,
            Self::ECHO => Self::Echo,
            Self::COMMAND => Self::Command,
            Self::EVENT => Self::Event,
            other => Self::Custom(other),
        }
    }

    /// The raw byte-0 value for this message type.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Meta => Self::META,
            Self::Echo => Self::ECHO,
            Self::Command => Self::COMMAND,
            Self::Event => Self::EVENT,
            Self::Custom(byte) => byte,
        }
    }

    /// `true` for any message type outside the reserved range.
    #[must_use]
    pub const fn is_custom(self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

/// `META` subtype, carried as byte 1 of a `META` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaId {
    /// Fixed protocol version string.
    HdcVersion,
    /// The device's configured maximum request size.
    MaxReq,
    /// The feature/command/event/property IDL, as a JSON string.
    IdlJson,
}

impl MetaId {
    /// Byte value for [`Self::HdcVersion`].
    pub const HDC_VERSION: u8 = 0xF0;
    /// Byte value for [`Self::MaxReq`].
    pub const MAX_REQ: u8 = 0xF1;
    /// Byte value for [`Self::IdlJson`].
    pub const IDL_JSON: u8 = 0xF2;

    /// Classify a raw `MetaId` byte. `None` for any value outside the three
    /// defined subtypes.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            Self::HDC_VERSION => Some(Self::HdcVersion),
            Self::MAX_REQ => Some(Self::MaxReq),
            Self::IDL_JSON => Some(Self::IdlJson),
            _ => None,
        }
    }

    /// The raw byte value for this `MetaId`.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::HdcVersion => Self::HDC_VERSION,
            Self::MaxReq => Self::MAX_REQ,
            Self::IdlJson => Self::IDL_JSON,
        }
    }
}

/// Reserved FeatureID of the one mandatory feature every device exposes.
pub const CORE_FEATURE_ID: u8 = 0x00;

/// Reserved CommandIDs mandated on every feature.
pub mod reserved_command {
    /// `GetPropertyValue`: reads any property registered on the feature.
    pub const GET_PROPERTY_VALUE: u8 = 0xF0;
    /// `SetPropertyValue`: writes any non-readonly property on the feature.
    pub const SET_PROPERTY_VALUE: u8 = 0xF1;
}

/// Reserved EventIDs mandated on every feature.
pub mod reserved_event {
    /// Structured log line, suppressed below the feature's `LogEventThreshold`.
    pub const LOG: u8 = 0xF0;
    /// Emitted automatically whenever `FeatureState` changes.
    pub const FEATURE_STATE_TRANSITION: u8 = 0xF1;
}

/// Reserved PropertyIDs mandated on every feature.
pub mod reserved_property {
    /// Numeric log-level threshold below which `LogEvent` is suppressed.
    pub const LOG_EVENT_THRESHOLD: u8 = 0xF0;
    /// The feature's current state, as an application-defined state id.
    pub const FEATURE_STATE: u8 = 0xF1;
}

/// Reserved ExceptionIDs with protocol-mandated meaning, carried as byte 3
/// of a failed command reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReservedException {
    /// The command's own implementation failed for an unanticipated reason.
    CommandFailed,
    /// The request addressed a FeatureID the device does not expose.
    UnknownFeature,
    /// The request addressed a CommandID unknown to the given feature.
    UnknownCommand,
    /// The request's argument payload did not parse per the command's dtypes.
    InvalidArgs,
    /// The command cannot be executed in the feature's current state.
    NotNow,
    /// `GetPropertyValue`/`SetPropertyValue` addressed an unknown PropertyID.
    UnknownProperty,
    /// `SetPropertyValue` addressed a property that has no setter.
    ReadOnlyProperty,
}

impl ReservedException {
    /// Byte value for [`Self::CommandFailed`].
    pub const COMMAND_FAILED: u8 = 0xF0;
    /// Byte value for [`Self::UnknownFeature`].
    pub const UNKNOWN_FEATURE: u8 = 0xF1;
    /// Byte value for [`Self::UnknownCommand`].
    pub const UNKNOWN_COMMAND: u8 = 0xF2;
    /// Byte value for [`Self::InvalidArgs`].
    pub const INVALID_ARGS: u8 = 0xF3;
    /// Byte value for [`Self::NotNow`].
    pub const NOT_NOW: u8 = 0xF4;
    /// Byte value for [`Self::UnknownProperty`].
    pub const UNKNOWN_PROPERTY: u8 = 0xF5;
    /// Byte value for [`Self::ReadOnlyProperty`].
    pub const READ_ONLY_PROPERTY: u8 = 0xF6;

    /// Classify a raw ExceptionID byte. `None` for `0x00` (success) and for
    /// any custom (`0x01..=0xEF`) value.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            Self::COMMAND_FAILED => Some(Self::CommandFailed),
            Self::UNKNOWN_FEATURE => Some(Self::UnknownFeature),
            Self::UNKNOWN_COMMAND => Some(Self::UnknownCommand),
            Self::INVALID_ARGS => Some(Self::InvalidArgs),
            Self::NOT_NOW => Some(Self::NotNow),
            Self::UNKNOWN_PROPERTY => Some(Self::UnknownProperty),
            Self::READ_ONLY_PROPERTY => Some(Self::ReadOnlyProperty),
            _ => None,
        }
    }

    /// The raw ExceptionID byte for this reserved exception.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        match self {
            Self::CommandFailed => Self::COMMAND_FAILED,
            Self::UnknownFeature => Self::UNKNOWN_FEATURE,
            Self::UnknownCommand => Self::UNKNOWN_COMMAND,
            Self::InvalidArgs => Self::INVALID_ARGS,
            Self::NotNow => Self::NOT_NOW,
            Self::UnknownProperty => Self::UNKNOWN_PROPERTY,
            Self::ReadOnlyProperty => Self::READ_ONLY_PROPERTY,
        }
    }

    /// The protocol-mandated name, as used in IDL and log output.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::CommandFailed => "CommandFailed",
            Self::UnknownFeature => "UnknownFeature",
            Self::UnknownCommand => "UnknownCommand",
            Self::InvalidArgs => "InvalidArgs",
            Self::NotNow => "NotNow",
            Self::UnknownProperty => "UnknownProperty",
            Self::ReadOnlyProperty => "ReadOnlyProperty",
        }
    }
}

/// ExceptionID `0x00`, meaning "no error" in a command reply.
pub const EXCEPTION_NO_ERROR: u8 = 0x00;

/// Fixed HDC protocol version string, as reported by `META.HDC_VERSION`.
pub const HDC_VERSION: &str = "HDC 1.0.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_boundary() {
        assert!(is_custom(0xEF));
        assert!(is_reserved(0xF0));
        assert!(!is_custom(0xF0));
        assert!(!is_reserved(0xEF));
    }

    #[test]
    fn message_type_round_trip() {
        for byte in 0x00u8..=0xFF {
            assert_eq!(MessageType::from_u8(byte).to_u8(), byte);
        }
        assert!(MessageType::from_u8(0x42).is_custom());
        assert!(!MessageType::from_u8(MessageType::COMMAND).is_custom());
    }

    #[test]
    fn reserved_exception_round_trip() {
        for byte in [
            ReservedException::COMMAND_FAILED,
            ReservedException::UNKNOWN_FEATURE,
            ReservedException::UNKNOWN_COMMAND,
            ReservedException::INVALID_ARGS,
            ReservedException::NOT_NOW,
            ReservedException::UNKNOWN_PROPERTY,
            ReservedException::READ_ONLY_PROPERTY,
        ] {
            let exc = ReservedException::from_u8(byte).expect("reserved byte should classify");
            assert_eq!(exc.to_u8(), byte);
        }
        assert_eq!(ReservedException::from_u8(0x01), None);
        assert_eq!(ReservedException::from_u8(0x00), None);
    }
}
