//! In-process loopback transport pair, for tests (§6 "Loopback/mock").
//!
//! Unlike the byte-stream transports, a [`MockTransport`] exchanges whole
//! messages directly — there is no wire to corrupt, so no packetizer is
//! involved.

use std::{
    sync::{mpsc, Arc, Mutex},
    thread,
};

use crate::{error::TransportError, OnConnectionLost, OnMessage, Transport};

/// One end of an in-process loopback pair. Create with [`mock_pair`].
pub struct MockTransport {
    url: String,
    outbound: Arc<Mutex<Option<mpsc::Sender<Vec<u8>>>>>,
    inbound: Option<mpsc::Receiver<Vec<u8>>>,
    receiver_thread: Option<thread::JoinHandle<()>>,
}

/// Build two connected [`MockTransport`]s; messages sent on one are
/// delivered to the other.
#[must_use]
pub fn mock_pair(url_a: impl Into<String>, url_b: impl Into<String>) -> (MockTransport, MockTransport) {
    let (tx_a_to_b, rx_a_to_b) = mpsc::channel();
    let (tx_b_to_a, rx_b_to_a) = mpsc::channel();
    (
        MockTransport {
            url: url_a.into(),
            outbound: Arc::new(Mutex::new(Some(tx_a_to_b))),
            inbound: Some(rx_b_to_a),
            receiver_thread: None,
        },
        MockTransport {
            url: url_b.into(),
            outbound: Arc::new(Mutex::new(Some(tx_b_to_a))),
            inbound: Some(rx_a_to_b),
            receiver_thread: None,
        },
    )
}

impl Transport for MockTransport {
    fn connect(
        &mut self,
        on_message: OnMessage,
        on_connection_lost: OnConnectionLost,
    ) -> Result<(), TransportError> {
        let Some(inbound) = self.inbound.take() else { return Err(TransportError::AlreadyConnected) };

        let handle = thread::spawn(move || {
            loop {
                match inbound.recv() {
                    Ok(message) => on_message(message),
                    Err(mpsc::RecvError) => {
                        on_connection_lost(None);
                        return;
                    },
                }
            }
        });
        self.receiver_thread = Some(handle);
        Ok(())
    }

    fn send_message(&self, message: &[u8]) -> Result<(), TransportError> {
        let guard = self.outbound.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let sender = guard.as_ref().ok_or(TransportError::NotConnected)?;
        sender.send(message.to_vec()).map_err(|_| TransportError::NotConnected)
    }

    fn flush(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.outbound.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take();
        if let Some(handle) = self.receiver_thread.take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.outbound.lock().unwrap_or_else(std::sync::PoisonError::into_inner).is_some()
    }

    fn url(&self) -> &str {
        &self.url
    }
}
