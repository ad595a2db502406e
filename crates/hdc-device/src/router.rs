//! The device-role router (§4.4): a single-pending-request gate, command
//! dispatch with exception-to-reply translation, inline `META` handling,
//! and the event-emission service.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, PoisonError, Weak},
};

use hdc_core::{Feature, HdcCmdException};
use hdc_proto::{
    dtype::Value,
    ids::{reserved_command, reserved_event, MessageType, MetaId, ReservedException, EXCEPTION_NO_ERROR, HDC_VERSION},
    payload::{decode_payload, decode_payload_scalar, encode_payload},
};
use hdc_transport::{CustomMessageParent, OnConnectionLost, OnMessage, Transport, TransportError};

use crate::{error::DeviceError, idl};

/// Default `max_req_size`, matching the firmware default of 2048 bytes (§6).
pub const DEFAULT_MAX_REQ_SIZE: u32 = 2048;

/// Smallest `max_req_size` the protocol allows: one type byte, one
/// FeatureID, one CommandID, and room for an `ExceptionID` reply (§6).
pub const MIN_MAX_REQ_SIZE: u32 = 5;

/// A command callable registered through [`DeviceRouter::register_command`]:
/// parsed arguments in, typed returns or a declared exception out.
type TypedCommand = dyn Fn(Vec<Value>) -> Result<Vec<Value>, HdcCmdException> + Send + Sync;

/// A command callable registered through [`DeviceRouter::register_raw_command`]:
/// receives the raw argument payload and must itself call
/// [`DeviceRouter::send_reply_for_pending_request`] exactly once.
type RawCommand = dyn Fn(&Arc<DeviceRouter>, Vec<u8>) + Send + Sync;

enum CommandHandler {
    Typed(Box<TypedCommand>),
    Raw(Box<RawCommand>),
}

/// Invoked once per inbound custom (`0x00..=0xEF`) message of the
/// registered type, with the prefix byte already stripped.
pub type CustomHandler = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Device-side router: owns the transport and the feature registry,
/// enforces single-pending-request, and translates command dispatch into
/// reply messages.
///
/// Must be held in an [`Arc`] — [`Self::connect`] hands the transport
/// weak-referencing closures, and command dispatch hands registered
/// handlers a strong [`Arc`] clone so they may reply asynchronously.
pub struct DeviceRouter {
    transport: Mutex<Box<dyn Transport>>,
    features: Mutex<BTreeMap<u8, Feature>>,
    command_handlers: Mutex<HashMap<(u8, u8), Arc<CommandHandler>>>,
    custom_handlers: Mutex<HashMap<u8, CustomHandler>>,
    pending: Mutex<Option<(u8, u8)>>,
    max_req_size: u32,
}

impl DeviceRouter {
    /// Build a router over `transport` with the default `max_req_size`
    /// ([`DEFAULT_MAX_REQ_SIZE`]). The Core feature (§3) is not added
    /// automatically — call [`Self::add_feature`] with
    /// [`hdc_core::core_feature`] to expose it.
    #[must_use]
    pub fn new(transport: impl Transport + 'static) -> Arc<Self> {
        Arc::new(Self {
            transport: Mutex::new(Box::new(transport)),
            features: Mutex::new(BTreeMap::new()),
            command_handlers: Mutex::new(HashMap::new()),
            custom_handlers: Mutex::new(HashMap::new()),
            pending: Mutex::new(None),
            max_req_size: DEFAULT_MAX_REQ_SIZE,
        })
    }

    /// Build a router with an explicit `max_req_size`.
    ///
    /// # Errors
    ///
    /// [`DeviceError::MaxReqSizeTooSmall`] if `max_req_size < `[`MIN_MAX_REQ_SIZE`].
    pub fn with_max_req_size(
        transport: impl Transport + 'static,
        max_req_size: u32,
    ) -> Result<Arc<Self>, DeviceError> {
        if max_req_size < MIN_MAX_REQ_SIZE {
            return Err(DeviceError::MaxReqSizeTooSmall(max_req_size));
        }
        Ok(Arc::new(Self {
            transport: Mutex::new(Box::new(transport)),
            features: Mutex::new(BTreeMap::new()),
            command_handlers: Mutex::new(HashMap::new()),
            custom_handlers: Mutex::new(HashMap::new()),
            pending: Mutex::new(None),
            max_req_size,
        }))
    }

    /// Begin reception on the underlying transport.
    ///
    /// # Errors
    ///
    /// Whatever [`Transport::connect`] returns.
    pub fn connect(self: &Arc<Self>) -> Result<(), TransportError> {
        let on_message_router = Arc::downgrade(self);
        let on_message: OnMessage = Box::new(move |msg| {
            if let Some(router) = on_message_router.upgrade() {
                router.handle_inbound(msg);
            }
        });

        let on_lost_router: Weak<Self> = Arc::downgrade(self);
        let on_connection_lost: OnConnectionLost = Box::new(move |err| {
            if let Some(router) = on_lost_router.upgrade() {
                router.handle_connection_lost(err);
            }
        });

        self.transport().connect(on_message, on_connection_lost)
    }

    fn transport(&self) -> std::sync::MutexGuard<'_, Box<dyn Transport>> {
        self.transport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a feature to the registry, wiring its mandatory
    /// `GetPropertyValue`/`SetPropertyValue` commands automatically.
    ///
    /// # Errors
    ///
    /// [`DeviceError::DuplicateFeature`] if a feature with this id is
    /// already registered.
    pub fn add_feature(self: &Arc<Self>, feature: Feature) -> Result<(), DeviceError> {
        let feature_id = feature.id();
        {
            let mut features = self.features.lock().unwrap_or_else(PoisonError::into_inner);
            if features.contains_key(&feature_id) {
                return Err(DeviceError::DuplicateFeature(feature_id));
            }
            features.insert(feature_id, feature);
        }

        let mut handlers = self.command_handlers.lock().unwrap_or_else(PoisonError::into_inner);
        handlers.insert(
            (feature_id, reserved_command::GET_PROPERTY_VALUE),
            Arc::new(CommandHandler::Raw(Box::new(move |router, payload| {
                router.handle_get_property(feature_id, payload);
            }))),
        );
        handlers.insert(
            (feature_id, reserved_command::SET_PROPERTY_VALUE),
            Arc::new(CommandHandler::Raw(Box::new(move |router, payload| {
                router.handle_set_property(feature_id, payload);
            }))),
        );
        Ok(())
    }

    /// Register the behavior of a command already declared (with its
    /// argument/return dtypes) on the feature's [`hdc_core::Feature`]
    /// descriptor.
    ///
    /// # Errors
    ///
    /// [`DeviceError::UnknownFeature`] if no feature with this id was added;
    /// [`DeviceError::UndeclaredCommand`] if the feature has no command
    /// descriptor for `command_id`.
    pub fn register_command<F>(&self, feature_id: u8, command_id: u8, callable: F) -> Result<(), DeviceError>
    where
        F: Fn(Vec<Value>) -> Result<Vec<Value>, HdcCmdException> + Send + Sync + 'static,
    {
        {
            let features = self.features.lock().unwrap_or_else(PoisonError::into_inner);
            let feature = features.get(&feature_id).ok_or(DeviceError::UnknownFeature(feature_id))?;
            if feature.command(command_id).is_none() {
                return Err(DeviceError::UndeclaredCommand { feature: feature_id, command: command_id });
            }
        }
        self.command_handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((feature_id, command_id), Arc::new(CommandHandler::Typed(Box::new(callable))));
        Ok(())
    }

    /// Register a low-level command handler that receives the raw argument
    /// payload and drives [`Self::send_reply_for_pending_request`] itself,
    /// possibly from another thread.
    pub fn register_raw_command(
        &self,
        feature_id: u8,
        command_id: u8,
        handler: Box<RawCommand>,
    ) {
        self.command_handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((feature_id, command_id), Arc::new(CommandHandler::Raw(handler)));
    }

    /// Register (or replace, with a warning) the handler for custom message
    /// type `message_type`.
    pub fn register_custom_message_handler(&self, message_type: u8, handler: CustomHandler) {
        let mut handlers = self.custom_handlers.lock().unwrap_or_else(PoisonError::into_inner);
        if handlers.insert(message_type, handler).is_some() {
            tracing::warn!(message_type, "replacing existing custom message handler");
        }
    }

    /// Emit an `EVENT` message for `(feature_id, event_id)` with `values`
    /// serialized per the event's declared argument dtypes.
    ///
    /// # Errors
    ///
    /// A transport error if the send fails.
    pub fn emit_event(&self, feature_id: u8, event_id: u8, values: &[Value]) -> Result<(), TransportError> {
        let mut msg = vec![MessageType::EVENT, feature_id, event_id];
        msg.extend(encode_payload(values));
        self.transport().send_message(&msg)
    }

    /// Emit a `Log` event at `level`, suppressed if below the feature's
    /// `LogEventThreshold` property (§4.4 "Event service").
    ///
    /// # Errors
    ///
    /// A transport error if the send is attempted and fails.
    pub fn emit_log(&self, feature_id: u8, level: u8, message: &str) -> Result<(), TransportError> {
        let suppressed = {
            let features = self.features.lock().unwrap_or_else(PoisonError::into_inner);
            features.get(&feature_id).is_none_or(|feature| feature.is_log_suppressed(level))
        };
        if suppressed {
            return Ok(());
        }
        self.emit_event(feature_id, reserved_event::LOG, &[Value::Uint8(level), Value::Utf8(message.to_owned())])
    }

    /// Transition `feature_id`'s `FeatureState`, automatically emitting
    /// `FeatureStateTransition` if the state actually changed.
    ///
    /// # Errors
    ///
    /// A transport error if the resulting event send fails.
    pub fn set_feature_state(&self, feature_id: u8, new_state: u8) -> Result<(), TransportError> {
        let transition = {
            let mut features = self.features.lock().unwrap_or_else(PoisonError::into_inner);
            features.get_mut(&feature_id).and_then(|feature| feature.set_feature_state(new_state))
        };
        match transition {
            Some((previous, new)) => self.emit_event(
                feature_id,
                reserved_event::FEATURE_STATE_TRANSITION,
                &[Value::Uint8(previous), Value::Uint8(new)],
            ),
            None => Ok(()),
        }
    }

    /// Complete the currently pending `COMMAND` request. Must be called
    /// exactly once per accepted request, with the same `(feature_id,
    /// command_id)` it was dispatched with.
    pub fn send_reply_for_pending_request(
        &self,
        feature_id: u8,
        command_id: u8,
        exception_id: u8,
        result_payload: &[u8],
    ) {
        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            match *pending {
                Some((pending_feature, pending_command))
                    if pending_feature == feature_id && pending_command == command_id =>
                {
                    *pending = None;
                },
                _ => {
                    debug_assert!(
                        false,
                        "send_reply_for_pending_request(0x{feature_id:02x}, 0x{command_id:02x}) \
                         does not match the currently pending request"
                    );
                    tracing::error!(
                        feature_id,
                        command_id,
                        "send_reply_for_pending_request called without a matching pending request"
                    );
                    return;
                },
            }
        }

        let mut reply = vec![MessageType::COMMAND, feature_id, command_id, exception_id];
        reply.extend_from_slice(result_payload);
        if let Err(err) = self.transport().send_message(&reply) {
            tracing::warn!(error = %err, "failed to send command reply");
        }
    }

    fn reply_with_exception(&self, feature_id: u8, command_id: u8, exc: ReservedException, message: &str) {
        self.send_reply_for_pending_request(feature_id, command_id, exc.to_u8(), message.as_bytes());
    }

    fn clear_pending(&self) {
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn complete_pending_with_raw_reply(&self, reply: Vec<u8>) {
        self.clear_pending();
        if let Err(err) = self.transport().send_message(&reply) {
            tracing::warn!(error = %err, "failed to send reply");
        }
    }

    fn handle_inbound(self: &Arc<Self>, msg: Vec<u8>) {
        if msg.is_empty() {
            return;
        }

        if let MessageType::Custom(message_type) = MessageType::from_u8(msg[0]) {
            let handlers = self.custom_handlers.lock().unwrap_or_else(PoisonError::into_inner);
            match handlers.get(&message_type) {
                Some(handler) => handler(&msg[1..]),
                None => tracing::debug!(message_type, "dropping custom message with no registered handler"),
            }
            return;
        }

        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            if pending.is_some() {
                tracing::warn!("dropping request while a previous one is still pending (host violated ordering)");
                return;
            }
            *pending = Some((0, 0));
        }

        match MessageType::from_u8(msg[0]) {
            MessageType::Meta => self.handle_meta(&msg),
            MessageType::Echo => self.complete_pending_with_raw_reply(msg),
            MessageType::Command => self.handle_command(&msg),
            MessageType::Event | MessageType::Custom(_) => {
                tracing::warn!(message_type = msg[0], "device received an unexpected message type");
                self.clear_pending();
            },
        }
    }

    fn handle_meta(&self, msg: &[u8]) {
        let Some(meta_id_byte) = msg.get(1).copied() else {
            tracing::warn!("dropping malformed META message (missing MetaID byte)");
            self.clear_pending();
            return;
        };

        let data = match MetaId::from_u8(meta_id_byte) {
            Some(MetaId::HdcVersion) => HDC_VERSION.as_bytes().to_vec(),
            Some(MetaId::MaxReq) => self.max_req_size.to_le_bytes().to_vec(),
            Some(MetaId::IdlJson) => {
                let features = self.features.lock().unwrap_or_else(PoisonError::into_inner);
                serde_json::to_vec(&idl::render(features.values())).unwrap_or_default()
            },
            None => {
                tracing::warn!(meta_id = meta_id_byte, "dropping META request with unknown MetaID");
                self.clear_pending();
                return;
            },
        };

        let mut reply = vec![MessageType::META, meta_id_byte];
        reply.extend(data);
        self.complete_pending_with_raw_reply(reply);
    }

    fn handle_command(self: &Arc<Self>, msg: &[u8]) {
        if msg.len() < 3 {
            tracing::warn!("dropping malformed COMMAND message (shorter than type+feature+command header)");
            self.clear_pending();
            return;
        }
        let feature_id = msg[1];
        let command_id = msg[2];
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some((feature_id, command_id));

        let handler = self
            .command_handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(feature_id, command_id))
            .map(Arc::clone);

        let Some(handler) = handler else {
            let feature_known = self.features.lock().unwrap_or_else(PoisonError::into_inner).contains_key(&feature_id);
            let exc = if feature_known { ReservedException::UnknownCommand } else { ReservedException::UnknownFeature };
            self.reply_with_exception(feature_id, command_id, exc, "");
            return;
        };

        match handler.as_ref() {
            CommandHandler::Raw(raw) => raw(self, msg[3..].to_vec()),
            CommandHandler::Typed(typed) => self.run_typed_command(feature_id, command_id, typed, &msg[3..]),
        }
    }

    fn run_typed_command(&self, feature_id: u8, command_id: u8, typed: &TypedCommand, payload: &[u8]) {
        let (arg_types, return_types) = {
            let features = self.features.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(feature) = features.get(&feature_id) else {
                self.reply_with_exception(feature_id, command_id, ReservedException::UnknownFeature, "");
                return;
            };
            let Some(descriptor) = feature.command(command_id) else {
                self.reply_with_exception(feature_id, command_id, ReservedException::UnknownCommand, "");
                return;
            };
            (descriptor.args.clone(), descriptor.returns.clone())
        };

        let args = match decode_payload(payload, &arg_types) {
            Ok(values) => values,
            Err(err) => {
                self.reply_with_exception(feature_id, command_id, ReservedException::InvalidArgs, &err.to_string());
                return;
            },
        };

        match typed(args) {
            Ok(returns) => {
                if returns.len() != return_types.len()
                    || returns.iter().zip(&return_types).any(|(value, dtype)| value.dtype() != *dtype)
                {
                    tracing::warn!(
                        feature_id,
                        command_id,
                        "command returned values not matching its declared return dtypes"
                    );
                }
                let reply_payload = encode_payload(&returns);
                self.send_reply_for_pending_request(feature_id, command_id, EXCEPTION_NO_ERROR, &reply_payload);
            },
            Err(exc) => {
                self.send_reply_for_pending_request(feature_id, command_id, exc.id(), exc.message().as_bytes());
            },
        }
    }

    fn handle_get_property(self: &Arc<Self>, feature_id: u8, payload: Vec<u8>) {
        let Some(&property_id) = payload.first() else {
            self.reply_with_exception(
                feature_id,
                reserved_command::GET_PROPERTY_VALUE,
                ReservedException::InvalidArgs,
                "missing PropertyID",
            );
            return;
        };

        let mut features = self.features.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(feature) = features.get_mut(&feature_id) else {
            drop(features);
            self.reply_with_exception(feature_id, reserved_command::GET_PROPERTY_VALUE, ReservedException::UnknownFeature, "");
            return;
        };

        match feature.get_property(property_id) {
            Ok(value) => {
                drop(features);
                let reply_payload = encode_payload(&[value]);
                self.send_reply_for_pending_request(
                    feature_id,
                    reserved_command::GET_PROPERTY_VALUE,
                    EXCEPTION_NO_ERROR,
                    &reply_payload,
                );
            },
            Err(err) => {
                drop(features);
                let exc: HdcCmdException = err.into();
                self.send_reply_for_pending_request(
                    feature_id,
                    reserved_command::GET_PROPERTY_VALUE,
                    exc.id(),
                    exc.message().as_bytes(),
                );
            },
        }
    }

    fn handle_set_property(self: &Arc<Self>, feature_id: u8, payload: Vec<u8>) {
        let Some(&property_id) = payload.first() else {
            self.reply_with_exception(
                feature_id,
                reserved_command::SET_PROPERTY_VALUE,
                ReservedException::InvalidArgs,
                "missing PropertyID",
            );
            return;
        };

        let mut features = self.features.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(feature) = features.get_mut(&feature_id) else {
            drop(features);
            self.reply_with_exception(feature_id, reserved_command::SET_PROPERTY_VALUE, ReservedException::UnknownFeature, "");
            return;
        };

        let Some(dtype) = feature.property(property_id).map(|descriptor| descriptor.dtype) else {
            drop(features);
            self.reply_with_exception(feature_id, reserved_command::SET_PROPERTY_VALUE, ReservedException::UnknownProperty, "");
            return;
        };

        let value = match decode_payload_scalar(&payload[1..], dtype) {
            Ok(value) => value,
            Err(err) => {
                drop(features);
                self.reply_with_exception(
                    feature_id,
                    reserved_command::SET_PROPERTY_VALUE,
                    ReservedException::InvalidArgs,
                    &err.to_string(),
                );
                return;
            },
        };

        match feature.set_property(property_id, value) {
            Ok(()) => {
                drop(features);
                self.send_reply_for_pending_request(feature_id, reserved_command::SET_PROPERTY_VALUE, EXCEPTION_NO_ERROR, &[]);
            },
            Err(err) => {
                drop(features);
                let exc: HdcCmdException = err.into();
                self.send_reply_for_pending_request(
                    feature_id,
                    reserved_command::SET_PROPERTY_VALUE,
                    exc.id(),
                    exc.message().as_bytes(),
                );
            },
        }
    }

    fn handle_connection_lost(&self, err: Option<TransportError>) {
        match &err {
            Some(err) => tracing::warn!(error = %err, "device transport connection lost"),
            None => tracing::info!("device transport closed"),
        }
        self.clear_pending();
    }
}

impl CustomMessageParent for DeviceRouter {
    fn send_custom_message(&self, message_type: u8, payload: &[u8]) -> Result<(), TransportError> {
        let mut message = Vec::with_capacity(payload.len() + 1);
        message.push(message_type);
        message.extend_from_slice(payload);
        self.transport().send_message(&message)
    }

    fn register_custom_message_handler(
        &self,
        message_type: u8,
        handler: Box<dyn Fn(&[u8]) + Send + Sync>,
    ) -> Result<(), TransportError> {
        let mut handlers = self.custom_handlers.lock().unwrap_or_else(PoisonError::into_inner);
        if handlers.contains_key(&message_type) {
            return Err(TransportError::TunnelIdInUse(message_type));
        }
        handlers.insert(message_type, handler);
        Ok(())
    }

    fn unregister_custom_message_handler(&self, message_type: u8) {
        self.custom_handlers.lock().unwrap_or_else(PoisonError::into_inner).remove(&message_type);
    }

    fn flush(&self) -> Result<(), TransportError> {
        self.transport().flush()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hdc_core::{core_feature, Feature};
    use hdc_proto::ids::{reserved_property, CORE_FEATURE_ID};
    use hdc_transport::mock::mock_pair;

    use super::*;

    fn spin_until(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn echo_replies_verbatim() {
        let (mut host_transport, device_transport) = mock_pair("mock://host", "mock://device");
        let device = DeviceRouter::new(device_transport);
        device.connect().unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        host_transport
            .connect(Box::new(move |msg| received_clone.lock().unwrap().push(msg)), Box::new(|_| {}))
            .unwrap();

        host_transport.send_message(&[MessageType::ECHO, 1, 2, 3]).unwrap();
        assert!(spin_until(|| !received.lock().unwrap().is_empty(), Duration::from_millis(500)));
        assert_eq!(received.lock().unwrap()[0], vec![MessageType::ECHO, 1, 2, 3]);
    }

    #[test]
    fn get_property_value_replies_with_default_log_threshold() {
        let (mut host_transport, device_transport) = mock_pair("mock://host", "mock://device");
        let device = DeviceRouter::new(device_transport);
        device.add_feature(Feature::new(0x00, "Core")).unwrap();
        device.connect().unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        host_transport
            .connect(Box::new(move |msg| received_clone.lock().unwrap().push(msg)), Box::new(|_| {}))
            .unwrap();

        host_transport
            .send_message(&[
                MessageType::COMMAND,
                0x00,
                reserved_command::GET_PROPERTY_VALUE,
                reserved_property::LOG_EVENT_THRESHOLD,
            ])
            .unwrap();

        assert!(spin_until(|| !received.lock().unwrap().is_empty(), Duration::from_millis(500)));
        assert_eq!(
            received.lock().unwrap()[0],
            vec![MessageType::COMMAND, 0x00, reserved_command::GET_PROPERTY_VALUE, 0x00, 30]
        );
    }

    #[test]
    fn unknown_feature_is_reported() {
        let (mut host_transport, device_transport) = mock_pair("mock://host", "mock://device");
        let device = DeviceRouter::new(device_transport);
        device.connect().unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        host_transport
            .connect(Box::new(move |msg| received_clone.lock().unwrap().push(msg)), Box::new(|_| {}))
            .unwrap();

        host_transport.send_message(&[MessageType::COMMAND, 0x42, reserved_command::GET_PROPERTY_VALUE]).unwrap();

        assert!(spin_until(|| !received.lock().unwrap().is_empty(), Duration::from_millis(500)));
        assert_eq!(
            received.lock().unwrap()[0],
            vec![MessageType::COMMAND, 0x42, reserved_command::GET_PROPERTY_VALUE, ReservedException::UNKNOWN_FEATURE]
        );
    }

    #[test]
    fn custom_command_wires_typed_callable() {
        let (mut host_transport, device_transport) = mock_pair("mock://host", "mock://device");
        let device = DeviceRouter::new(device_transport);

        let mut feature = Feature::new(0x01, "Motor");
        feature
            .register_command(hdc_core::CommandDescriptor::new(
                0x01,
                "SetSpeed",
                vec![hdc_proto::dtype::DataType::Uint32],
                vec![],
            ))
            .unwrap();
        device.add_feature(feature).unwrap();
        device
            .register_command(0x01, 0x01, |args| {
                let [Value::Uint32(_speed)] = args.as_slice() else {
                    return Err(HdcCmdException::reserved(ReservedException::InvalidArgs, "expected one UINT32"));
                };
                Ok(vec![])
            })
            .unwrap();
        device.connect().unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        host_transport
            .connect(Box::new(move |msg| received_clone.lock().unwrap().push(msg)), Box::new(|_| {}))
            .unwrap();

        let mut request = vec![MessageType::COMMAND, 0x01, 0x01];
        request.extend(100u32.to_le_bytes());
        host_transport.send_message(&request).unwrap();

        assert!(spin_until(|| !received.lock().unwrap().is_empty(), Duration::from_millis(500)));
        assert_eq!(received.lock().unwrap()[0], vec![MessageType::COMMAND, 0x01, 0x01, 0x00]);
    }

    #[test]
    fn max_req_size_floor_is_enforced() {
        let (_host_transport, device_transport) = mock_pair("mock://host", "mock://device");
        assert!(matches!(
            DeviceRouter::with_max_req_size(device_transport, 4),
            Err(DeviceError::MaxReqSizeTooSmall(4))
        ));
    }

    #[test]
    fn meta_idl_json_reports_registered_feature() {
        let (mut host_transport, device_transport) = mock_pair("mock://host", "mock://device");
        let device = DeviceRouter::new(device_transport);
        device.add_feature(core_feature()).unwrap();
        device.connect().unwrap();

        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        host_transport
            .connect(Box::new(move |msg| received_clone.lock().unwrap().push(msg)), Box::new(|_| {}))
            .unwrap();

        host_transport.send_message(&[MessageType::META, MetaId::IDL_JSON]).unwrap();
        assert!(spin_until(|| !received.lock().unwrap().is_empty(), Duration::from_millis(500)));

        let reply = received.lock().unwrap()[0].clone();
        assert_eq!(&reply[..2], [MessageType::META, MetaId::IDL_JSON]);
        let json: serde_json::Value = serde_json::from_slice(&reply[2..]).unwrap();
        assert_eq!(json["features"][0]["id"], CORE_FEATURE_ID);
    }

    proptest::proptest! {
        #[test]
        fn set_then_get_property_round_trips_arbitrary_u32(value: u32) {
            let (mut host_transport, device_transport) = mock_pair("mock://host", "mock://device");
            let device = DeviceRouter::new(device_transport);

            let store = Arc::new(Mutex::new(0u32));
            let store_read = Arc::clone(&store);
            let store_write = Arc::clone(&store);
            let mut feature = Feature::new(0x01, "Motor");
            feature
                .register_property(
                    hdc_core::PropertyDescriptor::new(0x02, "Speed", hdc_proto::dtype::DataType::Uint32, hdc_core::PropertyAccess::ReadWrite),
                    Box::new(move || Value::Uint32(*store_read.lock().unwrap())),
                    Some(Box::new(move |value| {
                        let Value::Uint32(speed) = value else { return Err(hdc_core::CoreError::PropertyTypeMismatch(0x02)) };
                        *store_write.lock().unwrap() = speed;
                        Ok(())
                    })),
                )
                .unwrap();
            device.add_feature(feature).unwrap();
            device.connect().unwrap();

            let received = Arc::new(Mutex::new(Vec::new()));
            let received_clone = Arc::clone(&received);
            host_transport
                .connect(Box::new(move |msg| received_clone.lock().unwrap().push(msg)), Box::new(|_| {}))
                .unwrap();

            let mut set_request = vec![MessageType::COMMAND, 0x01, reserved_command::SET_PROPERTY_VALUE, 0x02];
            set_request.extend(value.to_le_bytes());
            host_transport.send_message(&set_request).unwrap();
            assert!(spin_until(|| !received.lock().unwrap().is_empty(), Duration::from_millis(500)));

            host_transport
                .send_message(&[MessageType::COMMAND, 0x01, reserved_command::GET_PROPERTY_VALUE, 0x02])
                .unwrap();
            assert!(spin_until(|| received.lock().unwrap().len() > 1, Duration::from_millis(500)));

            let mut expected = vec![MessageType::COMMAND, 0x01, reserved_command::GET_PROPERTY_VALUE, 0x00];
            expected.extend(value.to_le_bytes());
            proptest::prop_assert_eq!(received.lock().unwrap()[1].clone(), expected);
        }
    }
}
