//! The host-role router (§4.3): a single-outstanding request/reply gate,
//! event demultiplexing, and custom-message pass-through, layered on top of
//! any [`Transport`].

use std::{
    collections::HashMap,
    sync::{Arc, Condvar, Mutex, PoisonError, Weak},
    time::Duration,
};

use hdc_proto::ids::MessageType;
use hdc_transport::{CustomMessageParent, OnConnectionLost, OnMessage, Transport, TransportError};

use crate::error::HostError;

/// Invoked once per `EVENT` message addressed to the registered
/// `(FeatureID, EventID)`. Runs on the transport's receiver thread; must be
/// fast and must never call [`HostRouter::send_request_and_get_reply`].
pub type EventHandler = Box<dyn Fn(Vec<u8>) + Send + Sync>;

/// Invoked once per inbound custom (`0x00..=0xEF`) message of the registered
/// type, with the prefix byte already stripped. Same threading constraints
/// as [`EventHandler`].
pub type CustomHandler = Box<dyn Fn(&[u8]) + Send + Sync>;

#[derive(Debug)]
enum ReplySlot {
    Idle,
    Message(Vec<u8>),
    Lost(Option<String>),
}

struct State {
    in_flight: bool,
    reply: ReplySlot,
}

/// Host-side router: owns the transport, enforces single-outstanding
/// request/reply, and demultiplexes events and custom messages.
///
/// Must be held in an [`Arc`] — [`Self::connect`] hands the transport
/// weak-referencing closures so the router can be dropped cleanly once its
/// transport is closed.
pub struct HostRouter {
    transport: Mutex<Box<dyn Transport>>,
    state: Mutex<State>,
    reply_cv: Condvar,
    event_handlers: Mutex<HashMap<(u8, u8), EventHandler>>,
    custom_handlers: Mutex<HashMap<u8, CustomHandler>>,
    strict_events: bool,
}

impl HostRouter {
    /// Build a router over `transport`. Does not connect; call
    /// [`Self::connect`] once handlers (if any) are registered.
    ///
    /// `strict_events`: whether an `EVENT` with no registered handler is
    /// logged at error level (`true`) or simply dropped at debug level
    /// (`false`, the default per §6 configuration surface).
    #[must_use]
    pub fn new(transport: impl Transport + 'static, strict_events: bool) -> Arc<Self> {
        Arc::new(Self {
            transport: Mutex::new(Box::new(transport)),
            state: Mutex::new(State { in_flight: false, reply: ReplySlot::Idle }),
            reply_cv: Condvar::new(),
            event_handlers: Mutex::new(HashMap::new()),
            custom_handlers: Mutex::new(HashMap::new()),
            strict_events,
        })
    }

    /// Begin reception on the underlying transport.
    ///
    /// # Errors
    ///
    /// Whatever [`Transport::connect`] returns (e.g. [`TransportError::AlreadyConnected`]).
    pub fn connect(self: &Arc<Self>) -> Result<(), TransportError> {
        let on_message_router = Arc::downgrade(self);
        let on_message: OnMessage = Box::new(move |msg| {
            if let Some(router) = on_message_router.upgrade() {
                router.handle_inbound(msg);
            }
        });

        let on_lost_router = Arc::downgrade(self);
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

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send `req` and block for its reply, up to `timeout`.
    ///
    /// # Errors
    ///
    /// [`HostError::RequestInFlight`] if a request is already outstanding;
    /// [`HostError::Timeout`] if no reply arrives in time (a later reply is
    /// then dropped silently); [`HostError::ConnectionLost`] if the
    /// transport reports loss while waiting; [`HostError::Transport`] if the
    /// write itself fails.
    pub fn send_request_and_get_reply(
        &self,
        req: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, HostError> {
        {
            let mut state = self.state();
            if state.in_flight {
                return Err(HostError::RequestInFlight);
            }
            state.in_flight = true;
            state.reply = ReplySlot::Idle;
        }

        if let Err(err) = self.transport().send_message(req) {
            self.state().in_flight = false;
            return Err(err.into());
        }

        let state = self.state();
        let (mut state, _timed_out) = self
            .reply_cv
            .wait_timeout_while(state, timeout, |s| matches!(s.reply, ReplySlot::Idle))
            .unwrap_or_else(PoisonError::into_inner);

        let result = match std::mem::replace(&mut state.reply, ReplySlot::Idle) {
            ReplySlot::Message(msg) => Ok(msg),
            ReplySlot::Lost(reason) => Err(HostError::ConnectionLost(reason)),
            ReplySlot::Idle => Err(HostError::Timeout),
        };
        state.in_flight = false;
        result
    }

    /// Register (or replace, with a warning) the handler for
    /// `(feature_id, event_id)`.
    pub fn register_event_message_handler(&self, feature_id: u8, event_id: u8, handler: EventHandler) {
        let mut handlers = self.event_handlers.lock().unwrap_or_else(PoisonError::into_inner);
        if handlers.insert((feature_id, event_id), handler).is_some() {
            tracing::warn!(feature_id, event_id, "replacing existing event handler");
        }
    }

    /// Register (or replace, with a warning) the handler for custom message
    /// type `message_type`.
    pub fn register_custom_message_handler(&self, message_type: u8, handler: CustomHandler) {
        let mut handlers = self.custom_handlers.lock().unwrap_or_else(PoisonError::into_inner);
        if handlers.insert(message_type, handler).is_some() {
            tracing::warn!(message_type, "replacing existing custom message handler");
        }
    }

    /// `true` once [`Self::connect`] has succeeded and the transport has not
    /// since reported loss or been closed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport().is_connected()
    }

    fn handle_inbound(&self, msg: Vec<u8>) {
        if msg.is_empty() {
            return;
        }
        match MessageType::from_u8(msg[0]) {
            MessageType::Meta | MessageType::Echo | MessageType::Command => self.deliver_reply(msg),
            MessageType::Event => self.dispatch_event(&msg),
            MessageType::Custom(message_type) => self.dispatch_custom(message_type, &msg[1..]),
        }
    }

    fn deliver_reply(&self, msg: Vec<u8>) {
        let mut state = self.state();
        if !state.in_flight {
            tracing::debug!("dropping unsolicited reply; no request in flight");
            return;
        }
        state.reply = ReplySlot::Message(msg);
        drop(state);
        self.reply_cv.notify_one();
    }

    fn dispatch_event(&self, msg: &[u8]) {
        if msg.len() < 3 {
            tracing::warn!("dropping malformed event message (shorter than feature/event id header)");
            return;
        }
        let feature_id = msg[1];
        let event_id = msg[2];
        let handlers = self.event_handlers.lock().unwrap_or_else(PoisonError::into_inner);
        match handlers.get(&(feature_id, event_id)) {
            Some(handler) => handler(msg.to_vec()),
            None if self.strict_events => {
                tracing::error!(feature_id, event_id, "no handler registered for event (strict_events)");
            },
            None => tracing::debug!(feature_id, event_id, "dropping event with no registered handler"),
        }
    }

    fn dispatch_custom(&self, message_type: u8, payload: &[u8]) {
        let handlers = self.custom_handlers.lock().unwrap_or_else(PoisonError::into_inner);
        match handlers.get(&message_type) {
            Some(handler) => handler(payload),
            None => tracing::debug!(message_type, "dropping custom message with no registered handler"),
        }
    }

    fn handle_connection_lost(&self, err: Option<TransportError>) {
        let reason = err.map(|e| e.to_string());
        match &reason {
            Some(reason) => tracing::warn!(error = %reason, "host transport connection lost"),
            None => tracing::info!("host transport closed"),
        }

        let mut state = self.state();
        if state.in_flight {
            state.reply = ReplySlot::Lost(reason);
            drop(state);
            self.reply_cv.notify_one();
        }
    }
}

impl CustomMessageParent for HostRouter {
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
