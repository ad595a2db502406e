//! The [`Feature`] descriptor: a named, ID-addressed grouping of commands,
//! events, and properties, carrying the mandatory members every HDC feature
//! exposes (§3 "Feature").

use std::collections::BTreeMap;

use hdc_proto::{
    dtype::{DataType, Value},
    ids::{reserved_command, reserved_event, reserved_property},
};

use crate::{
    descriptor::{CommandDescriptor, EventDescriptor, PropertyAccess, PropertyDescriptor},
    error::CoreError,
    log_level,
};

type PropertyGetter = Box<dyn Fn() -> Value + Send + Sync>;
type PropertySetter = Box<dyn Fn(Value) -> Result<(), CoreError> + Send + Sync>;

enum PropertyBacking {
    /// Backed by [`Feature::log_event_threshold`].
    LogEventThreshold,
    /// Backed by [`Feature::feature_state`]; never settable via the wire.
    FeatureState,
    /// Backed by application-supplied closures.
    Custom { getter: PropertyGetter, setter: Option<PropertySetter> },
}

struct PropertyEntry {
    descriptor: PropertyDescriptor,
    backing: PropertyBacking,
}

/// A feature: an ID-addressed catalog of commands, events, and properties,
/// plus the storage backing the two mandatory properties.
///
/// Every feature is constructed with the mandatory members already present:
/// the `GetPropertyValue`/`SetPropertyValue` commands, the `Log`/
/// `FeatureStateTransition` events, and the `LogEventThreshold`/
/// `FeatureState` properties. Application code adds its own commands,
/// events, and properties on top via [`Self::register_command`] etc.
pub struct Feature {
    id: u8,
    name: String,
    commands: BTreeMap<u8, CommandDescriptor>,
    events: BTreeMap<u8, EventDescriptor>,
    properties: BTreeMap<u8, PropertyEntry>,
    log_event_threshold: u8,
    feature_state: u8,
}

impl std::fmt::Debug for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feature")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("log_event_threshold", &self.log_event_threshold)
            .field("feature_state", &self.feature_state)
            .finish()
    }
}

impl Feature {
    /// Create a feature with the mandatory commands/events/properties
    /// already registered.
    #[must_use]
    pub fn new(id: u8, name: impl Into<String>) -> Self {
        let mut commands = BTreeMap::new();
        commands.insert(
            reserved_command::GET_PROPERTY_VALUE,
            CommandDescriptor::new(
                reserved_command::GET_PROPERTY_VALUE,
                "GetPropertyValue",
                vec![DataType::Uint8],
                Vec::new(), // return dtype depends on the targeted property
            ),
        );
        commands.insert(
            reserved_command::SET_PROPERTY_VALUE,
            CommandDescriptor::new(
                reserved_command::SET_PROPERTY_VALUE,
                "SetPropertyValue",
                vec![DataType::Uint8], // PropertyID, followed by the property's own dtype
                Vec::new(),
            ),
        );

        let mut events = BTreeMap::new();
        events.insert(
            reserved_event::LOG,
            EventDescriptor::new(reserved_event::LOG, "Log", vec![DataType::Uint8, DataType::Utf8]),
        );
        events.insert(
            reserved_event::FEATURE_STATE_TRANSITION,
            EventDescriptor::new(
                reserved_event::FEATURE_STATE_TRANSITION,
                "FeatureStateTransition",
                vec![DataType::Uint8, DataType::Uint8],
            ),
        );

        let mut properties = BTreeMap::new();
        properties.insert(
            reserved_property::LOG_EVENT_THRESHOLD,
            PropertyEntry {
                descriptor: PropertyDescriptor::new(
                    reserved_property::LOG_EVENT_THRESHOLD,
                    "LogEventThreshold",
                    DataType::Uint8,
                    PropertyAccess::ReadWrite,
                ),
                backing: PropertyBacking::LogEventThreshold,
            },
        );
        properties.insert(
            reserved_property::FEATURE_STATE,
            PropertyEntry {
                descriptor: PropertyDescriptor::new(
                    reserved_property::FEATURE_STATE,
                    "FeatureState",
                    DataType::Uint8,
                    PropertyAccess::ReadOnly,
                ),
                backing: PropertyBacking::FeatureState,
            },
        );

        Self {
            id,
            name: name.into(),
            commands,
            events,
            properties,
            log_event_threshold: log_level::WARNING,
            feature_state: 0,
        }
    }

    /// FeatureID.
    #[must_use]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Identifier-style name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a command beyond the mandatory two.
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateCommand`] if `descriptor.id` is already in use
    /// (including by `GetPropertyValue`/`SetPropertyValue`).
    pub fn register_command(&mut self, descriptor: CommandDescriptor) -> Result<(), CoreError> {
        if self.commands.contains_key(&descriptor.id) {
            return Err(CoreError::DuplicateCommand { feature: self.id, id: descriptor.id });
        }
        self.commands.insert(descriptor.id, descriptor);
        Ok(())
    }

    /// Register an event beyond the mandatory two.
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateEvent`] if `descriptor.id` is already in use.
    pub fn register_event(&mut self, descriptor: EventDescriptor) -> Result<(), CoreError> {
        if self.events.contains_key(&descriptor.id) {
            return Err(CoreError::DuplicateEvent { feature: self.id, id: descriptor.id });
        }
        self.events.insert(descriptor.id, descriptor);
        Ok(())
    }

    /// Register an application-defined property backed by `getter` (and
    /// `setter`, if it is writable).
    ///
    /// # Errors
    ///
    /// [`CoreError::DuplicateProperty`] if `descriptor.id` is already in use
    /// (including by `LogEventThreshold`/`FeatureState`).
    pub fn register_property(
        &mut self,
        descriptor: PropertyDescriptor,
        getter: PropertyGetter,
        setter: Option<PropertySetter>,
    ) -> Result<(), CoreError> {
        if self.properties.contains_key(&descriptor.id) {
            return Err(CoreError::DuplicateProperty { feature: self.id, id: descriptor.id });
        }
        let id = descriptor.id;
        self.properties.insert(id, PropertyEntry { descriptor, backing: PropertyBacking::Custom { getter, setter } });
        Ok(())
    }

    /// Look up a command descriptor.
    #[must_use]
    pub fn command(&self, id: u8) -> Option<&CommandDescriptor> {
        self.commands.get(&id)
    }

    /// Look up an event descriptor.
    #[must_use]
    pub fn event(&self, id: u8) -> Option<&EventDescriptor> {
        self.events.get(&id)
    }

    /// Look up a property descriptor.
    #[must_use]
    pub fn property(&self, id: u8) -> Option<&PropertyDescriptor> {
        self.properties.get(&id).map(|entry| &entry.descriptor)
    }

    /// Iterate every command descriptor, in ascending id order.
    pub fn commands(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values()
    }

    /// Iterate every event descriptor, in ascending id order.
    pub fn events(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.events.values()
    }

    /// Iterate every property descriptor, in ascending id order.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.properties.values().map(|entry| &entry.descriptor)
    }

    /// Read a property's current value.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownProperty`] if no property with this id is registered.
    pub fn get_property(&self, id: u8) -> Result<Value, CoreError> {
        let entry = self.properties.get(&id).ok_or(CoreError::UnknownProperty(id))?;
        Ok(match &entry.backing {
            PropertyBacking::LogEventThreshold => Value::Uint8(self.log_event_threshold),
            PropertyBacking::FeatureState => Value::Uint8(self.feature_state),
            PropertyBacking::Custom { getter, .. } => getter(),
        })
    }

    /// Write a property's value.
    ///
    /// # Errors
    ///
    /// [`CoreError::UnknownProperty`] if no property with this id is
    /// registered; [`CoreError::ReadOnlyProperty`] if it has no setter;
    /// [`CoreError::PropertyTypeMismatch`] if `value`'s dtype does not match
    /// the property's declared dtype.
    pub fn set_property(&mut self, id: u8, value: Value) -> Result<(), CoreError> {
        let entry = self.properties.get(&id).ok_or(CoreError::UnknownProperty(id))?;
        if entry.descriptor.is_readonly() {
            return Err(CoreError::ReadOnlyProperty(id));
        }
        if value.dtype() != entry.descriptor.dtype {
            return Err(CoreError::PropertyTypeMismatch(id));
        }

        match &entry.backing {
            PropertyBacking::LogEventThreshold => {
                let Value::Uint8(level) = value else { return Err(CoreError::PropertyTypeMismatch(id)) };
                self.log_event_threshold = log_level::clamp_and_round(level);
                Ok(())
            },
            PropertyBacking::FeatureState => Err(CoreError::ReadOnlyProperty(id)),
            PropertyBacking::Custom { setter, .. } => {
                setter.as_ref().ok_or(CoreError::ReadOnlyProperty(id))?(value)
            },
        }
    }

    /// Current `LogEventThreshold`.
    #[must_use]
    pub fn log_event_threshold(&self) -> u8 {
        self.log_event_threshold
    }

    /// `true` if a `LogEvent` at `level` should be suppressed under the
    /// current threshold.
    #[must_use]
    pub fn is_log_suppressed(&self, level: u8) -> bool {
        level < self.log_event_threshold
    }

    /// Current `FeatureState`.
    #[must_use]
    pub fn feature_state(&self) -> u8 {
        self.feature_state
    }

    /// Transition to `new_state`. Returns `Some((previous, new))` if the
    /// state actually changed (the caller should then emit
    /// `FeatureStateTransition`), or `None` for a no-op transition to the
    /// current state.
    pub fn set_feature_state(&mut self, new_state: u8) -> Option<(u8, u8)> {
        if new_state == self.feature_state {
            return None;
        }
        let previous = self.feature_state;
        self.feature_state = new_state;
        Some((previous, new_state))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use hdc_proto::ids::reserved_property;

    use super::*;

    #[test]
    fn mandatory_members_are_present_on_construction() {
        let feature = Feature::new(0x01, "Motor");
        assert!(feature.command(reserved_command::GET_PROPERTY_VALUE).is_some());
        assert!(feature.command(reserved_command::SET_PROPERTY_VALUE).is_some());
        assert!(feature.event(reserved_event::LOG).is_some());
        assert!(feature.event(reserved_event::FEATURE_STATE_TRANSITION).is_some());
        assert!(feature.property(reserved_property::LOG_EVENT_THRESHOLD).is_some());
        assert!(feature.property(reserved_property::FEATURE_STATE).is_some());
    }

    #[test]
    fn log_event_threshold_defaults_to_warning_and_clamps_on_write() {
        let mut feature = Feature::new(0x01, "Motor");
        assert_eq!(feature.log_event_threshold(), log_level::WARNING);

        feature.set_property(reserved_property::LOG_EVENT_THRESHOLD, Value::Uint8(255)).unwrap();
        assert_eq!(feature.log_event_threshold(), log_level::CRITICAL);
    }

    #[test]
    fn feature_state_is_read_only_via_set_property() {
        let mut feature = Feature::new(0x01, "Motor");
        let err = feature.set_property(reserved_property::FEATURE_STATE, Value::Uint8(1)).unwrap_err();
        assert_eq!(err, CoreError::ReadOnlyProperty(reserved_property::FEATURE_STATE));
    }

    #[test]
    fn set_feature_state_reports_transition_once() {
        let mut feature = Feature::new(0x01, "Motor");
        assert_eq!(feature.set_feature_state(1), Some((0, 1)));
        assert_eq!(feature.set_feature_state(1), None);
        assert_eq!(feature.feature_state(), 1);
    }

    #[test]
    fn custom_property_round_trips_through_closures() {
        let store = Arc::new(Mutex::new(0u32));
        let store_read = Arc::clone(&store);
        let store_write = Arc::clone(&store);

        let mut feature = Feature::new(0x01, "Motor");
        feature
            .register_property(
                PropertyDescriptor::new(0x01, "Speed", DataType::Uint32, PropertyAccess::ReadWrite),
                Box::new(move || Value::Uint32(*store_read.lock().unwrap())),
                Some(Box::new(move |value| {
                    let Value::Uint32(speed) = value else { return Err(CoreError::PropertyTypeMismatch(0x01)) };
                    *store_write.lock().unwrap() = speed;
                    Ok(())
                })),
            )
            .unwrap();

        feature.set_property(0x01, Value::Uint32(42)).unwrap();
        assert_eq!(feature.get_property(0x01).unwrap(), Value::Uint32(42));
    }

    #[test]
    fn duplicate_command_id_is_rejected() {
        let mut feature = Feature::new(0x01, "Motor");
        let err = feature
            .register_command(CommandDescriptor::new(
                reserved_command::GET_PROPERTY_VALUE,
                "Bogus",
                vec![],
                vec![],
            ))
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::DuplicateCommand { feature: 0x01, id: reserved_command::GET_PROPERTY_VALUE }
        );
    }

    #[test]
    fn unknown_property_is_reported() {
        let feature = Feature::new(0x01, "Motor");
        assert_eq!(feature.get_property(0x77), Err(CoreError::UnknownProperty(0x77)));
    }
}
