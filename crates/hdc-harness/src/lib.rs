//! Deterministic end-to-end test harness: wires an [`hdc_host::HostRouter`]
//! and an [`hdc_device::DeviceRouter`] together over a loopback
//! [`hdc_transport::mock::MockTransport`] pair, with small oracle helpers for
//! asserting on the resulting wire traffic.
//!
//! Scenario tests built on this harness live in `tests/`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use hdc_device::DeviceRouter;
use hdc_host::HostRouter;
use hdc_transport::{mock::mock_pair, TransportError};

/// Default timeout for `send_request_and_get_reply` in a scenario test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(2);

/// A connected host/device pair sharing an in-process loopback transport.
pub struct Pair {
    /// The host-side router under test.
    pub host: Arc<HostRouter>,
    /// The device-side router under test.
    pub device: Arc<DeviceRouter>,
}

impl Pair {
    /// Build and connect a host/device pair. `build_device` configures the
    /// device's feature registry and command handlers before it connects.
    ///
    /// # Errors
    ///
    /// A transport error if either side fails to connect (never expected for
    /// the loopback mock transport, but propagated rather than unwrapped so
    /// callers control how a harness setup failure is reported).
    pub fn new(build_device: impl FnOnce(&Arc<DeviceRouter>)) -> Result<Self, TransportError> {
        let (host_transport, device_transport) = mock_pair("mock://host", "mock://device");

        let device = DeviceRouter::new(device_transport);
        build_device(&device);
        device.connect()?;

        let host = HostRouter::new(host_transport, false);
        host.connect()?;

        Ok(Self { host, device })
    }
}

/// Spin-wait up to `timeout` for `condition` to become true, checking every
/// 5ms. Used to await asynchronous deliveries (events, connection-lost
/// notifications) that do not go through the request/reply gate.
pub fn wait_for(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// A shared log of messages received by a handler registered with
/// [`HostRouter::register_event_message_handler`] or
/// [`HostRouter::register_custom_message_handler`], for oracle assertions.
#[derive(Clone, Default)]
pub struct MessageLog(Arc<Mutex<Vec<Vec<u8>>>>);

impl MessageLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A handler closure that appends every message it receives to this log.
    #[must_use]
    pub fn recorder(&self) -> Box<dyn Fn(Vec<u8>) + Send + Sync> {
        let log = self.0.clone();
        Box::new(move |msg| log.lock().unwrap_or_else(std::sync::PoisonError::into_inner).push(msg))
    }

    /// Snapshot of every message recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner).clone()
    }

    /// Number of messages recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    /// `true` if no messages have been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
