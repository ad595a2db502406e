//! Tunnel adapter: encapsulates a sub-protocol's byte stream inside a single
//! custom message type on a parent router's transport (§4.5).
//!
//! A [`TunnelTransport`] is itself a [`Transport`] — it can be handed to
//! another `hdc-core`-style stack (or to a plain byte consumer) exactly as if
//! it owned a dedicated wire, even though it actually rides piggyback on the
//! parent's already-connected transport.

use std::sync::{Arc, Mutex};

use crate::{error::TransportError, CustomMessageParent, OnConnectionLost, OnMessage, Transport};

/// Lowest id in the reserved range (§3 identifier taxonomy); tunnel ids must
/// fall below it.
const RESERVED_RANGE_START: u8 = 0xF0;

/// A transport that tunnels whole messages through one custom message type
/// of a parent [`CustomMessageParent`].
pub struct TunnelTransport<P: CustomMessageParent> {
    tunnel_id: u8,
    url: String,
    parent: Arc<P>,
    registered: Mutex<bool>,
}

impl<P: CustomMessageParent> TunnelTransport<P> {
    /// Build a tunnel over `parent` using custom message type `tunnel_id`.
    ///
    /// # Errors
    ///
    /// [`TransportError::TunnelIdReserved`] if `tunnel_id` falls in the
    /// reserved range `0xF0..=0xFF`.
    pub fn new(parent: Arc<P>, tunnel_id: u8) -> Result<Self, TransportError> {
        if tunnel_id >= RESERVED_RANGE_START {
            return Err(TransportError::TunnelIdReserved(tunnel_id));
        }
        Ok(Self {
            tunnel_id,
            url: format!("tunnel://{tunnel_id:#04x}"),
            parent,
            registered: Mutex::new(false),
        })
    }

    /// The custom message type this tunnel occupies on the parent.
    #[must_use]
    pub fn tunnel_id(&self) -> u8 {
        self.tunnel_id
    }
}

impl<P: CustomMessageParent> Transport for TunnelTransport<P> {
    fn connect(
        &mut self,
        on_message: OnMessage,
        _on_connection_lost: OnConnectionLost,
    ) -> Result<(), TransportError> {
        let mut registered = self.registered.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if *registered {
            return Err(TransportError::AlreadyConnected);
        }

        self.parent.register_custom_message_handler(
            self.tunnel_id,
            Box::new(move |payload: &[u8]| on_message(payload.to_vec())),
        )?;
        *registered = true;
        Ok(())
    }

    fn send_message(&self, message: &[u8]) -> Result<(), TransportError> {
        if !*self.registered.lock().unwrap_or_else(std::sync::PoisonError::into_inner) {
            return Err(TransportError::NotConnected);
        }
        self.parent.send_custom_message(self.tunnel_id, message)
    }

    fn flush(&self) -> Result<(), TransportError> {
        self.parent.flush()
    }

    fn close(&mut self) -> Result<(), TransportError> {
        let mut registered = self.registered.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if *registered {
            self.parent.unregister_custom_message_handler(self.tunnel_id);
            *registered = false;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        *self.registered.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn url(&self) -> &str {
        &self.url
    }
}
